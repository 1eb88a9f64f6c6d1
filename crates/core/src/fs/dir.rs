use super::{ArchiveFs, DirEntry};
use crate::error::{Result, StoreError};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Exploded store on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

impl ArchiveFs for DirFs {
    fn origin(&self) -> &Path {
        &self.root
    }

    fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        let path = self.resolve(dir);
        let entries = match std::fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&path, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StoreError::io(entry.path(), e))?;
            // Symlinks are reported as their target, like `is_file` and `walk_files` see them
            let is_dir = if file_type.is_symlink() {
                std::fs::metadata(entry.path()).is_ok_and(|m| m.is_dir())
            } else {
                file_type.is_dir()
            };
            result.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn is_file(&self, path: &str) -> Result<bool> {
        let path = self.resolve(path);
        match std::fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(path);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn walk_files(&self, root: &str) -> Result<Vec<String>> {
        let start = self.resolve(root);
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&start).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Err(e)
                    if e.loop_ancestor().is_none()
                        && e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) =>
                {
                    debug!("Skipping dangling link {:?}", e.path());
                    continue;
                }
                other => other,
            };
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| start.clone());
                match e.into_io_error() {
                    Some(io_err) => StoreError::io(path, io_err),
                    None => StoreError::archive(path, "filesystem loop"),
                }
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            if let Some(relative) = self.relative(entry.path()) {
                files.push(relative);
            }
        }
        Ok(files)
    }
}
