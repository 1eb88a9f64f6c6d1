//! Store over the running JDK's module image.
//!
//! Paths follow the jrt layout: `modules/<module>/<package>/<Class>.class`,
//! plus `packages/<dotted.package>/<module>` entries when the image has them.
//! The package → module ownership index is built once, at open.

use crate::error::{Result, StoreError};
use crate::fs::{ArchiveFs, DirFs, JimageFs};
use crate::names;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::BitOr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub const JAVA_BASE: &str = "java.base";
const MODULES_ROOT: &str = "modules";
const PACKAGES_ROOT: &str = "packages";

/// Modules declaring a package.
///
/// `java.base` is always listed first when it is one of the owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModuleOwnership {
    Single(String),
    Multiple(Vec<String>),
}

impl ModuleOwnership {
    pub fn modules(&self) -> &[String] {
        match self {
            ModuleOwnership::Single(module) => std::slice::from_ref(module),
            ModuleOwnership::Multiple(modules) => modules,
        }
    }

    pub fn len(&self) -> usize {
        self.modules().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules().is_empty()
    }

    /// Record another owner; single ownership becomes multiple on the first new module.
    pub fn add(&mut self, module: &str) {
        match self {
            ModuleOwnership::Single(existing) if existing == module => {}
            ModuleOwnership::Single(existing) => {
                let existing = std::mem::take(existing);
                let modules = if module == JAVA_BASE {
                    vec![module.to_string(), existing]
                } else {
                    vec![existing, module.to_string()]
                };
                *self = ModuleOwnership::Multiple(modules);
            }
            ModuleOwnership::Multiple(modules) => {
                if modules.iter().any(|m| m == module) {
                    return;
                }
                if module == JAVA_BASE {
                    modules.insert(0, module.to_string());
                } else {
                    modules.push(module.to_string());
                }
            }
        }
    }
}

/// Which granularities a walk reports to its visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyMask(u8);

impl NotifyMask {
    pub const MODULES: NotifyMask = NotifyMask(0b001);
    pub const PACKAGES: NotifyMask = NotifyMask(0b010);
    pub const FILES: NotifyMask = NotifyMask(0b100);
    pub const ALL: NotifyMask = NotifyMask(0b111);

    pub fn contains(self, other: NotifyMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for NotifyMask {
    type Output = NotifyMask;

    fn bitor(self, rhs: NotifyMask) -> NotifyMask {
        NotifyMask(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    /// Skip the children of a module or package, or the remaining files of a package.
    SkipSubtree,
    Terminate,
}

pub trait ImageVisitor {
    fn visit_module(&mut self, _module: &str) -> Result<WalkControl> {
        Ok(WalkControl::Continue)
    }

    /// `package` is slash separated, relative to the module.
    fn visit_package(&mut self, _module: &str, _package: &str) -> Result<WalkControl> {
        Ok(WalkControl::Continue)
    }

    fn visit_file(&mut self, _module: &str, _package: &str, _file: &str) -> Result<WalkControl> {
        Ok(WalkControl::Continue)
    }
}

pub struct LiveImageStore {
    fs: Arc<dyn ArchiveFs>,
    /// Slash-separated package → owners
    packages: HashMap<String, ModuleOwnership>,
    /// `java.base` first, the rest in name order
    modules: Vec<String>,
}

impl std::fmt::Debug for LiveImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveImageStore")
            .field("origin", &self.fs.origin())
            .field("modules", &self.modules.len())
            .field("packages", &self.packages.len())
            .finish()
    }
}

impl LiveImageStore {
    /// Open `<home>/lib/modules`, or the exploded `<home>/modules` directory.
    pub fn open(home: &Path) -> Result<Self> {
        let image = home.join("lib").join("modules");
        if image.is_file() {
            return Self::from_fs(Arc::new(JimageFs::open(&image)?));
        }
        if home.join(MODULES_ROOT).is_dir() {
            return Self::from_fs(Arc::new(DirFs::new(home)));
        }
        Err(StoreError::MissingImage(home.to_path_buf()))
    }

    pub fn from_fs(fs: Arc<dyn ArchiveFs>) -> Result<Self> {
        let start = Instant::now();

        let mut modules: Vec<String> = fs
            .read_dir(MODULES_ROOT)?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name)
            .collect();
        if let Some(idx) = modules.iter().position(|m| m == JAVA_BASE) {
            let base = modules.remove(idx);
            modules.insert(0, base);
        }

        let mut store = Self {
            fs,
            packages: HashMap::new(),
            modules,
        };
        store.walk_jrt_for_modules()?;

        info!(
            "Opened live image {}: {} modules, {} packages in {:?}",
            store.fs.origin().display(),
            store.modules.len(),
            store.packages.len(),
            start.elapsed()
        );
        Ok(store)
    }

    /// Build the ownership index from the `packages/<dotted>/<module>` entries.
    ///
    /// Images without that root (exploded builds) are indexed from the module
    /// trees instead.
    fn walk_jrt_for_modules(&mut self) -> Result<()> {
        for file in self.fs.walk_files(PACKAGES_ROOT)? {
            let Some(relative) = file
                .strip_prefix(PACKAGES_ROOT)
                .and_then(|r| r.strip_prefix('/'))
            else {
                continue;
            };
            if let Some((package, module)) = relative.rsplit_once('/') {
                self.cache_package(&package.replace('.', "/"), module);
            }
        }

        if self.packages.is_empty() {
            debug!(
                "No package roots in {}, indexing module trees",
                self.fs.origin().display()
            );
            for module in self.modules.clone() {
                let module_root = names::join(&[MODULES_ROOT, module.as_str()]);
                for file in self.fs.walk_files(&module_root)? {
                    let Some(relative) = file
                        .strip_prefix(module_root.as_str())
                        .and_then(|r| r.strip_prefix('/'))
                    else {
                        continue;
                    };
                    let package = names::package_of(relative);
                    if !package.is_empty() {
                        self.cache_package(package, &module);
                    }
                }
            }
        }
        Ok(())
    }

    fn cache_package(&mut self, package: &str, module: &str) {
        match self.packages.get_mut(package) {
            Some(ownership) => ownership.add(module),
            None => {
                self.packages.insert(
                    package.to_string(),
                    ModuleOwnership::Single(module.to_string()),
                );
            }
        }
    }

    pub fn origin(&self) -> &Path {
        self.fs.origin()
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Owners of the package of `name`, `java.base` when the package is unknown.
    pub fn get_modules(&self, name: &str) -> ModuleOwnership {
        self.packages
            .get(names::package_of(name))
            .cloned()
            .unwrap_or_else(|| ModuleOwnership::Single(JAVA_BASE.to_string()))
    }

    /// Find `name` using the ownership index to pick candidate modules.
    pub fn locate(&self, name: &str, module: Option<&str>) -> Result<Option<String>> {
        let class_file = names::as_class_file(name);
        let name: &str = &class_file;
        if let Some(module) = module {
            return self.probe(module, name);
        }
        for module in self.get_modules(name).modules() {
            if let Some(path) = self.probe(module, name)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Find `name` by trying every module in order, ignoring the ownership index.
    pub fn locate_uncached(&self, name: &str, module: Option<&str>) -> Result<Option<String>> {
        let class_file = names::as_class_file(name);
        let name: &str = &class_file;
        if let Some(module) = module {
            return self.probe(module, name);
        }
        for module in &self.modules {
            if let Some(path) = self.probe(module, name)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn probe(&self, module: &str, name: &str) -> Result<Option<String>> {
        let path = names::join(&[MODULES_ROOT, module, name]);
        Ok(self.fs.is_file(&path)?.then_some(path))
    }

    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.fs.read(path)
    }

    /// Depth-first traversal of `modules/<module>/<package>/<file>`.
    ///
    /// Modules rejected by `include_module` are skipped without being reported.
    pub fn walk(
        &self,
        visitor: &mut dyn ImageVisitor,
        mask: NotifyMask,
        include_module: &dyn Fn(&str) -> bool,
    ) -> Result<()> {
        for module in &self.modules {
            if !include_module(module) {
                continue;
            }
            if mask.contains(NotifyMask::MODULES) {
                match visitor.visit_module(module)? {
                    WalkControl::Continue => {}
                    WalkControl::SkipSubtree => continue,
                    WalkControl::Terminate => return Ok(()),
                }
            }
            let root = names::join(&[MODULES_ROOT, module.as_str()]);
            if self.walk_dir(visitor, mask, module, &root, "")? == WalkControl::Terminate {
                return Ok(());
            }
        }
        Ok(())
    }

    fn walk_dir(
        &self,
        visitor: &mut dyn ImageVisitor,
        mask: NotifyMask,
        module: &str,
        dir: &str,
        package: &str,
    ) -> Result<WalkControl> {
        for entry in self.fs.read_dir(dir)? {
            if entry.is_dir {
                let child_package = names::join(&[package, entry.name.as_str()]);
                if mask.contains(NotifyMask::PACKAGES) {
                    match visitor.visit_package(module, &child_package)? {
                        WalkControl::Continue => {}
                        WalkControl::SkipSubtree => continue,
                        WalkControl::Terminate => return Ok(WalkControl::Terminate),
                    }
                }
                let child_dir = names::join(&[dir, entry.name.as_str()]);
                let control = self.walk_dir(visitor, mask, module, &child_dir, &child_package)?;
                if control == WalkControl::Terminate {
                    return Ok(control);
                }
            } else if mask.contains(NotifyMask::FILES) {
                match visitor.visit_file(module, package, &entry.name)? {
                    WalkControl::Continue => {}
                    WalkControl::SkipSubtree => return Ok(WalkControl::Continue),
                    WalkControl::Terminate => return Ok(WalkControl::Terminate),
                }
            }
        }
        Ok(WalkControl::Continue)
    }
}
