use super::{ArchiveFs, DirEntry, NameTree};
use crate::error::{Result, StoreError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

/// Zip-backed store such as `lib/ct.sym`.
///
/// Entry names are indexed once at open. Reads borrow a handle from a small
/// idle pool and decompress without holding the pool lock. A failing handle is
/// dropped and a fresh one opened on next use.
pub struct ZipFs {
    path: PathBuf,
    tree: NameTree,
    idle: Mutex<Vec<ZipArchive<File>>>,
    reopens: AtomicUsize,
}

/// Idle handles kept for reuse; extra handles opened under contention are dropped.
const MAX_IDLE_HANDLES: usize = 4;

/// No signature file comes close; larger declared sizes mean a corrupt archive.
const MAX_ENTRY_SIZE: u64 = 1 << 31;

impl std::fmt::Debug for ZipFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipFs")
            .field("path", &self.path)
            .field("entries", &self.tree.file_count())
            .finish()
    }
}

impl ZipFs {
    pub fn open(path: &Path) -> Result<Self> {
        let mut archive = Self::open_archive(path)?;

        let mut tree = NameTree::default();
        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| zip_error(path, e))?;
            if entry.is_dir() {
                tree.insert_dir(entry.name());
            } else {
                tree.insert_file(entry.name());
            }
        }
        debug!(
            "Indexed {} entries of {}",
            tree.file_count(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            tree,
            idle: Mutex::new(vec![archive]),
            reopens: AtomicUsize::new(0),
        })
    }

    fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        ZipArchive::new(file).map_err(|e| zip_error(path, e))
    }

    /// Drop every idle handle. The next read reopens the archive.
    pub fn close(&self) {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn take_handle(&self) -> Result<ZipArchive<File>> {
        let pooled = self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop();
        match pooled {
            Some(archive) => Ok(archive),
            None => {
                debug!("Reopening {}", self.path.display());
                self.reopens.fetch_add(1, Ordering::Relaxed);
                Self::open_archive(&self.path)
            }
        }
    }

    fn return_handle(&self, archive: ZipArchive<File>) {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < MAX_IDLE_HANDLES {
            idle.push(archive);
        }
    }

    /// Number of times the archive was reopened after the initial open.
    pub fn reopen_count(&self) -> usize {
        self.reopens.load(Ordering::Relaxed)
    }

    fn read_entry(
        archive: &mut ZipArchive<File>,
        name: &str,
    ) -> std::result::Result<Vec<u8>, ZipError> {
        let mut entry = archive.by_name(name)?;
        if entry.size() > MAX_ENTRY_SIZE {
            return Err(ZipError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{name} declares {} bytes", entry.size()),
            )));
        }
        // Declared sizes come from the archive and are not used to preallocate
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl ArchiveFs for ZipFs {
    fn origin(&self) -> &Path {
        &self.path
    }

    fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        Ok(self.tree.children(dir))
    }

    fn is_file(&self, path: &str) -> Result<bool> {
        Ok(self.tree.is_file(path))
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        if !self.tree.is_file(path) {
            return Ok(None);
        }

        let mut retried = false;
        loop {
            let mut archive = self.take_handle()?;
            match Self::read_entry(&mut archive, path) {
                Ok(bytes) => {
                    self.return_handle(archive);
                    return Ok(Some(bytes));
                }
                Err(ZipError::FileNotFound) => {
                    self.return_handle(archive);
                    return Ok(None);
                }
                Err(ZipError::Io(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
                    return Err(StoreError::io(&self.path, e));
                }
                Err(e) if !retried => {
                    warn!(
                        "Read of {} in {} failed, reopening: {}",
                        path,
                        self.path.display(),
                        e
                    );
                    retried = true;
                }
                Err(e) => return Err(zip_error(&self.path, e)),
            }
        }
    }
}

fn zip_error(path: &Path, err: ZipError) -> StoreError {
    match err {
        ZipError::Io(e) => StoreError::io(path, e),
        other => StoreError::archive(path, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_zip_fs_reads_entries() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ct.sym");
        create_test_zip(
            &path,
            &[
                ("9ABC/java.base/java/util/List.sig", b"list"),
                ("9ABC/system-modules", b""),
            ],
        );

        let zip_fs = ZipFs::open(&path).unwrap();
        assert_eq!(zip_fs.read_dir("").unwrap().len(), 1);
        assert!(zip_fs.is_file("9ABC/system-modules").unwrap());
        assert_eq!(
            zip_fs.read("9ABC/java.base/java/util/List.sig").unwrap(),
            Some(b"list".to_vec())
        );
        assert_eq!(zip_fs.read("9ABC/java.base/java/util/Map.sig").unwrap(), None);
        assert_eq!(zip_fs.reopen_count(), 0);
    }

    #[test]
    fn test_closed_handle_is_recreated() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ct.sym");
        create_test_zip(&path, &[("B/java/lang/Object.sig", b"object")]);

        let zip_fs = ZipFs::open(&path).unwrap();
        zip_fs.close();

        assert_eq!(
            zip_fs.read("B/java/lang/Object.sig").unwrap(),
            Some(b"object".to_vec())
        );
        assert_eq!(zip_fs.reopen_count(), 1);
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ct.sym");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        assert!(matches!(
            ZipFs::open(&path),
            Err(StoreError::Archive { .. })
        ));
    }

    /// Single stored, empty entry whose central record declares a zip64 size of 2^62.
    fn zip_with_declared_size(name: &str) -> Vec<u8> {
        let name = name.as_bytes();
        let mut out = Vec::new();

        // Local file header
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0x21u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);

        // Central directory
        let central_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0x21u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&12u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&0x0001u16.to_le_bytes());
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&(1u64 << 62).to_le_bytes());
        let central_size = out.len() as u32 - central_offset;

        // End of central directory
        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&central_size.to_le_bytes());
        out.extend_from_slice(&central_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn test_declared_entry_size_is_not_trusted() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ct.sym");
        let name = "B/java/lang/Huge.sig";
        std::fs::write(&path, zip_with_declared_size(name)).unwrap();

        match ZipFs::open(&path).and_then(|zip_fs| zip_fs.read(name)) {
            Ok(Some(bytes)) => assert!(bytes.is_empty()),
            Ok(None) => panic!("{name} should be listed"),
            Err(e) => assert!(matches!(
                e,
                StoreError::Archive { .. } | StoreError::Io { .. }
            )),
        }
    }

    #[test]
    fn test_concurrent_reads_each_get_their_entry() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ct.sym");
        let names: Vec<String> = (0..8).map(|i| format!("B/p/C{i}.sig")).collect();
        let entries: Vec<(&str, &[u8])> = names
            .iter()
            .map(|n| (n.as_str(), n.as_bytes()))
            .collect();
        create_test_zip(&path, &entries);

        let zip_fs = ZipFs::open(&path).unwrap();
        let barrier = std::sync::Barrier::new(names.len());
        std::thread::scope(|scope| {
            for name in &names {
                let zip_fs = &zip_fs;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    for _ in 0..10 {
                        assert_eq!(zip_fs.read(name).unwrap(), Some(name.as_bytes().to_vec()));
                    }
                });
            }
        });

        // At most one extra handle per concurrent reader
        assert!(zip_fs.reopen_count() < names.len());
    }
}
