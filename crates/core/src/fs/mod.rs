//! Read-only views over the two JDK store formats.
//!
//! Every backend presents archive-relative paths separated by `/`, with the
//! empty string naming the root. Listings are always in name order so that
//! walks and linear scans visit candidates identically.

mod dir;
mod jimage;
mod tree;
mod zip;

pub use dir::DirFs;
pub use jimage::JimageFs;
pub use tree::NameTree;
pub use zip::ZipFs;

use crate::error::Result;
use crate::names;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

pub trait ArchiveFs: Send + Sync + fmt::Debug {
    /// File or directory on disk backing this view
    fn origin(&self) -> &Path;

    /// Children of `dir` in name order. A missing directory has no children.
    fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>>;

    fn is_file(&self, path: &str) -> Result<bool>;

    /// Content of a regular file, `None` when absent.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Every non-directory entry under `root` as full archive paths, depth first, in name order.
    fn walk_files(&self, root: &str) -> Result<Vec<String>> {
        let mut files = Vec::new();
        walk_with_read_dir(self, root, &mut files)?;
        Ok(files)
    }
}

fn walk_with_read_dir<F: ArchiveFs + ?Sized>(
    fs: &F,
    dir: &str,
    files: &mut Vec<String>,
) -> Result<()> {
    for entry in fs.read_dir(dir)? {
        let path = names::join(&[dir, entry.name.as_str()]);
        if entry.is_dir {
            walk_with_read_dir(fs, &path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Debug)]
    struct TreeOnly {
        origin: PathBuf,
        tree: NameTree,
    }

    impl ArchiveFs for TreeOnly {
        fn origin(&self) -> &Path {
            &self.origin
        }

        fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
            Ok(self.tree.children(dir))
        }

        fn is_file(&self, path: &str) -> Result<bool> {
            Ok(self.tree.is_file(path))
        }

        fn read(&self, _path: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_default_walk_is_depth_first_in_name_order() {
        let mut tree = NameTree::default();
        for path in ["B/z.sig", "A/m/x.sig", "A/a.sig", "A/m/n/y.sig"] {
            tree.insert_file(path);
        }
        let fs = TreeOnly {
            origin: PathBuf::from("/synthetic"),
            tree,
        };

        assert_eq!(
            fs.walk_files("A").unwrap(),
            vec!["A/a.sig", "A/m/n/y.sig", "A/m/x.sig"]
        );
        assert_eq!(fs.walk_files("").unwrap().len(), 4);
        assert!(fs.walk_files("missing").unwrap().is_empty());
    }
}
