use super::{ArchiveFs, DirEntry, NameTree};
use crate::error::{Result, StoreError};
use crate::names;
use ristretto_jimage::Image;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub const MODULES_ROOT: &str = "modules";
pub const PACKAGES_ROOT: &str = "packages";

/// The runtime image `lib/modules` presented in jrt shape.
///
/// Resources appear as `modules/<module>/<path>`; every package additionally
/// appears as `packages/<dotted.package>/<module>`.
pub struct JimageFs {
    path: PathBuf,
    image: Mutex<Image>,
    tree: NameTree,
}

impl std::fmt::Debug for JimageFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JimageFs")
            .field("path", &self.path)
            .field("entries", &self.tree.file_count())
            .finish()
    }
}

impl JimageFs {
    pub fn open(path: &Path) -> Result<Self> {
        let image =
            Image::from_file(path).map_err(|e| StoreError::archive(path, format!("{e:?}")))?;

        let mut tree = NameTree::default();
        let mut skipped = 0usize;
        for resource_result in image.iter() {
            let resource = match resource_result {
                Ok(resource) => resource,
                Err(e) => {
                    skipped += 1;
                    debug!("Unreadable resource in {}: {:?}", path.display(), e);
                    continue;
                }
            };
            let name = resource.name();
            let Some((module, rest)) = split_resource_name(&name) else {
                continue;
            };
            tree.insert_file(&names::join(&[MODULES_ROOT, module, rest]));

            let package = names::package_of(rest);
            if !package.is_empty() {
                let dotted = package.replace('/', ".");
                tree.insert_file(&names::join(&[PACKAGES_ROOT, dotted.as_str(), module]));
            }
        }
        if skipped > 0 {
            warn!("Skipped {} unreadable resources in {}", skipped, path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            image: Mutex::new(image),
            tree,
        })
    }
}

/// Split `/java.base/java/lang/Object.class` into module and module-relative path.
fn split_resource_name(name: &str) -> Option<(&str, &str)> {
    let (module, rest) = name.trim_start_matches('/').split_once('/')?;
    if module.is_empty() || rest.is_empty() {
        None
    } else {
        Some((module, rest))
    }
}

impl ArchiveFs for JimageFs {
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
        let Some(resource_path) = path
            .strip_prefix(MODULES_ROOT)
            .and_then(|p| p.strip_prefix('/'))
        else {
            return Ok(None);
        };
        if !self.tree.is_file(path) {
            return Ok(None);
        }

        let image = self.image.lock().unwrap_or_else(|e| e.into_inner());
        let resource = image
            .get_resource(&format!("/{resource_path}"))
            .map_err(|e| StoreError::archive(&self.path, format!("{resource_path}: {e:?}")))?;
        Ok(Some(resource.data().to_vec()))
    }
}
