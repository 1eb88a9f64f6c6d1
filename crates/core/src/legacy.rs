//! Store over the `ct.sym` signature archive.
//!
//! Top-level directories are named by the release codes they serve (`9ABC`
//! serves 9, 10, 11 and 12). Archives shipped with JDK 11 and earlier nest
//! class paths directly under the release directory; later ones insert a module
//! directory first. The directory of the archive's own release carries a
//! `system-modules` marker and is never served from here.

use crate::cache::OnceMap;
use crate::error::Result;
use crate::fs::{ArchiveFs, DirFs, ZipFs};
use crate::names;
use crate::release::ReleaseCode;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Marker file inside the directory describing the running JDK's own release.
pub const CURRENT_RELEASE_MARKER: &str = "system-modules";

/// JDK 11's archive answers `--release 10` without a module segment.
const UNMODULED_RELEASE_CODE: &str = "A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    /// `<release>/<package path>/<Class>.sig`
    Flat,
    /// `<release>/<module>/<package path>/<Class>.sig`
    Modular,
}

impl Layout {
    /// Layout of the archive shipped with a JDK of the given release.
    pub fn for_jdk_release(release: u32) -> Self {
        if release > 11 {
            Layout::Modular
        } else {
            Layout::Flat
        }
    }

    fn lookup_key(self, name: &str, module: Option<&str>) -> IndexKey {
        match (self, module) {
            (Layout::Modular, Some(module)) => {
                IndexKey::InModule(module.to_string(), name.to_string())
            }
            (Layout::Modular, None) => IndexKey::AnyModule(name.to_string()),
            (Layout::Flat, _) => IndexKey::Direct(name.to_string()),
        }
    }

    /// Record a file found `relative` to its release directory.
    ///
    /// The first path recorded for a key wins, so walk order decides between
    /// duplicates exactly as a linear probe would.
    fn record(self, index: &mut ReleaseIndex, relative: &str, path: &str) {
        let mut keep = |key: IndexKey| {
            index.entry(key).or_insert_with(|| path.to_string());
        };
        keep(IndexKey::Direct(relative.to_string()));
        if self == Layout::Modular {
            if let Some((module, name)) = relative.split_once('/') {
                keep(IndexKey::InModule(module.to_string(), name.to_string()));
                keep(IndexKey::AnyModule(name.to_string()));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IndexKey {
    /// Path relative to the release directory
    Direct(String),
    /// Class path under the named module directory
    InModule(String, String),
    /// Class path under the first module directory holding it
    AnyModule(String),
}

/// Directories serving one release code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RootSet {
    /// Served directories, in name order
    pub roots: Vec<String>,
    /// Matching directories excluded because they describe the running JDK
    pub excluded_current: Vec<String>,
}

impl RootSet {
    /// The release is the running JDK's own and must come from the live image.
    pub fn defers_to_live(&self) -> bool {
        self.roots.is_empty() && !self.excluded_current.is_empty()
    }
}

/// Archive path of every file under one release's directories.
type ReleaseIndex = HashMap<IndexKey, String>;

pub struct LegacySymbolStore {
    fs: Arc<dyn ArchiveFs>,
    layout: Layout,
    roots: OnceMap<ReleaseCode, Arc<RootSet>>,
    indexes: OnceMap<ReleaseCode, Arc<ReleaseIndex>>,
}

impl std::fmt::Debug for LegacySymbolStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacySymbolStore")
            .field("origin", &self.fs.origin())
            .field("layout", &self.layout)
            .finish()
    }
}

impl LegacySymbolStore {
    /// Open `ct_sym` as shipped with a JDK of `jdk_release`.
    ///
    /// Returns `None` when the JDK ships no archive.
    pub fn open(ct_sym: &Path, jdk_release: u32) -> Result<Option<Self>> {
        let fs: Arc<dyn ArchiveFs> = if ct_sym.is_file() {
            Arc::new(ZipFs::open(ct_sym)?)
        } else if ct_sym.is_dir() {
            Arc::new(DirFs::new(ct_sym))
        } else {
            debug!("No signature archive at {}", ct_sym.display());
            return Ok(None);
        };

        let layout = Layout::for_jdk_release(jdk_release);
        info!("Opened {} with {:?} layout", ct_sym.display(), layout);
        Ok(Some(Self::with_fs(fs, layout)))
    }

    pub fn with_fs(fs: Arc<dyn ArchiveFs>, layout: Layout) -> Self {
        Self {
            fs,
            layout,
            roots: OnceMap::new(),
            indexes: OnceMap::new(),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn origin(&self) -> &Path {
        self.fs.origin()
    }

    /// Directories serving `code`, scanned once per code.
    pub fn release_roots(&self, code: &ReleaseCode) -> Result<Arc<RootSet>> {
        self.roots
            .get_or_try_init(code.clone(), || self.scan_roots(code).map(Arc::new))
    }

    fn scan_roots(&self, code: &ReleaseCode) -> Result<RootSet> {
        let mut set = RootSet::default();
        for entry in self.fs.read_dir("")? {
            if !entry.is_dir || !code.matches_dir(&entry.name) {
                continue;
            }
            if self.layout == Layout::Modular {
                let marker = names::join(&[entry.name.as_str(), CURRENT_RELEASE_MARKER]);
                if self.fs.is_file(&marker)? {
                    debug!(
                        "{} describes the running JDK, not serving release {}",
                        entry.name, code
                    );
                    set.excluded_current.push(entry.name);
                    continue;
                }
            }
            set.roots.push(entry.name);
        }
        Ok(set)
    }

    /// Resolve through the per-release index, walking the release directories on first use.
    pub fn locate(
        &self,
        code: &ReleaseCode,
        name: &str,
        module: Option<&str>,
    ) -> Result<Option<String>> {
        let signature = names::as_signature_file(name);
        let name: &str = &signature;
        let index = self.release_index(code)?;

        if let Some(path) = index.get(&self.layout.lookup_key(name, module)) {
            return Ok(Some(path.clone()));
        }
        if self.retries_unmoduled(code, module) {
            return Ok(index.get(&IndexKey::Direct(name.to_string())).cloned());
        }
        Ok(None)
    }

    /// Resolve by probing each release directory in turn.
    pub fn locate_uncached(
        &self,
        code: &ReleaseCode,
        name: &str,
        module: Option<&str>,
    ) -> Result<Option<String>> {
        let signature = names::as_signature_file(name);
        let name: &str = &signature;
        let roots = self.release_roots(code)?;

        for root in &roots.roots {
            if let Some(path) = self.probe_root(root, name, module)? {
                return Ok(Some(path));
            }
        }
        if self.retries_unmoduled(code, module) {
            for root in &roots.roots {
                let path = names::join(&[root.as_str(), name]);
                if self.fs.is_file(&path)? {
                    return Ok(Some(path));
                }
            }
        }
        Ok(None)
    }

    fn retries_unmoduled(&self, code: &ReleaseCode, module: Option<&str>) -> bool {
        self.layout == Layout::Modular
            && module.is_some()
            && code.as_str() == UNMODULED_RELEASE_CODE
    }

    fn probe_root(&self, root: &str, name: &str, module: Option<&str>) -> Result<Option<String>> {
        match (self.layout, module) {
            (Layout::Flat, _) => self.probe(names::join(&[root, name])),
            (Layout::Modular, Some(module)) => self.probe(names::join(&[root, module, name])),
            (Layout::Modular, None) => {
                for entry in self.fs.read_dir(root)? {
                    if !entry.is_dir {
                        continue;
                    }
                    let candidate = names::join(&[root, entry.name.as_str(), name]);
                    if let Some(path) = self.probe(candidate)? {
                        return Ok(Some(path));
                    }
                }
                Ok(None)
            }
        }
    }

    fn probe(&self, path: String) -> Result<Option<String>> {
        Ok(self.fs.is_file(&path)?.then_some(path))
    }

    fn release_index(&self, code: &ReleaseCode) -> Result<Arc<ReleaseIndex>> {
        self.indexes
            .get_or_try_init(code.clone(), || self.build_index(code).map(Arc::new))
    }

    fn build_index(&self, code: &ReleaseCode) -> Result<ReleaseIndex> {
        let start = Instant::now();
        let roots = self.release_roots(code)?;

        let mut index = ReleaseIndex::new();
        for root in &roots.roots {
            for path in self.fs.walk_files(root)? {
                let Some(relative) = path
                    .strip_prefix(root.as_str())
                    .and_then(|r| r.strip_prefix('/'))
                else {
                    continue;
                };
                self.layout.record(&mut index, relative, &path);
            }
        }

        debug!(
            "Indexed release {} of {}: {} keys across {} directories in {:?}",
            code,
            self.fs.origin().display(),
            index.len(),
            roots.roots.len(),
            start.elapsed()
        );
        Ok(index)
    }

    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.fs.read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, path: &str) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, path.as_bytes()).unwrap();
    }

    fn code(level: u32) -> ReleaseCode {
        ReleaseCode::from_level(level).unwrap()
    }

    fn modular_store(root: &Path) -> LegacySymbolStore {
        LegacySymbolStore::with_fs(Arc::new(DirFs::new(root)), Layout::Modular)
    }

    #[test]
    fn test_layout_by_jdk_release() {
        assert_eq!(Layout::for_jdk_release(11), Layout::Flat);
        assert_eq!(Layout::for_jdk_release(12), Layout::Modular);
        assert_eq!(Layout::for_jdk_release(21), Layout::Modular);
    }

    #[test]
    fn test_release_roots_skip_metadata_and_current() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "9ABC/java.base/java/util/List.sig");
        write(root, "BCD/java.base/java/util/Map.sig");
        write(root, "B-modules/java.base/module-info.sig");
        write(root, "DEFGH/java.base/java/lang/Record.sig");
        write(root, "H/system-modules");
        write(root, "H/java.base/java/lang/Object.sig");

        let store = modular_store(root);

        let roots = store.release_roots(&code(11)).unwrap();
        assert_eq!(roots.roots, vec!["9ABC", "BCD"]);
        assert!(!roots.defers_to_live());

        let current = store.release_roots(&code(17)).unwrap();
        assert_eq!(current.roots, vec!["DEFGH"]);
        assert_eq!(current.excluded_current, vec!["H"]);
        assert!(!current.defers_to_live());

        assert!(store.release_roots(&code(30)).unwrap().roots.is_empty());
    }

    #[test]
    fn test_only_current_directory_defers_to_live() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "L/system-modules");
        write(temp.path(), "L/java.base/java/lang/Object.sig");

        let store = modular_store(temp.path());
        assert!(store.release_roots(&code(21)).unwrap().defers_to_live());
        assert_eq!(
            store.locate(&code(21), "java/lang/Object.sig", None).unwrap(),
            None
        );
    }

    #[test]
    fn test_flat_layout_lookup() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "789A/java/lang/Object.sig");
        write(temp.path(), "A/java/lang/Record.sig");

        let store = LegacySymbolStore::with_fs(Arc::new(DirFs::new(temp.path())), Layout::Flat);

        for (name, expected) in [
            ("java/lang/Object.class", Some("789A/java/lang/Object.sig")),
            ("java/lang/Record.sig", Some("A/java/lang/Record.sig")),
            ("java/lang/Missing.sig", None),
        ] {
            let expected = expected.map(str::to_string);
            assert_eq!(store.locate(&code(10), name, Some("java.base")).unwrap(), expected);
            assert_eq!(store.locate_uncached(&code(10), name, None).unwrap(), expected);
        }
    }

    #[test]
    fn test_modular_lookup_with_and_without_module() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "9ABC/java.base/java/util/List.sig");
        write(temp.path(), "9ABC/java.sql/java/sql/Driver.sig");

        let store = modular_store(temp.path());
        let list = Some("9ABC/java.base/java/util/List.sig".to_string());

        assert_eq!(store.locate(&code(11), "java/util/List.sig", None).unwrap(), list);
        assert_eq!(
            store.locate(&code(11), "java/util/List.sig", Some("java.base")).unwrap(),
            list
        );
        assert_eq!(
            store.locate(&code(11), "java/util/List.sig", Some("java.sql")).unwrap(),
            None
        );
        assert_eq!(
            store.locate_uncached(&code(11), "java/util/List.sig", None).unwrap(),
            list
        );
        assert_eq!(
            store.locate_uncached(&code(11), "java/util/List.sig", Some("java.sql")).unwrap(),
            None
        );
    }

    #[test]
    fn test_release_ten_retries_without_module() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "9A/java/lang/Object.sig");
        write(temp.path(), "B/java.base/java/lang/Object.sig");

        let store = modular_store(temp.path());
        let expected = Some("9A/java/lang/Object.sig".to_string());

        assert_eq!(
            store.locate(&code(10), "java/lang/Object.sig", Some("java.base")).unwrap(),
            expected
        );
        assert_eq!(
            store
                .locate_uncached(&code(10), "java/lang/Object.sig", Some("java.base"))
                .unwrap(),
            expected
        );

        // The retry is specific to release 10
        write(temp.path(), "9/java/lang/Object.sig");
        assert_eq!(
            store.locate(&code(9), "java/lang/Object.sig", Some("java.base")).unwrap(),
            None
        );
        assert_eq!(
            store
                .locate_uncached(&code(9), "java/lang/Object.sig", Some("java.base"))
                .unwrap(),
            None
        );
    }
}
