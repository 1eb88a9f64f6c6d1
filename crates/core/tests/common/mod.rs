#![allow(dead_code)]

use jdkstore::fs::{ArchiveFs, DirEntry};
use jdkstore::{Result, StoreError};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn write(root: &Path, path: &str, content: &[u8]) {
    let full = root.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, content).unwrap();
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

/// JDK 17 home with an exploded image and a `ct.sym` directory.
pub fn jdk17_home(root: &Path) {
    write(root, "release", b"JAVA_VERSION=\"17.0.2\"\n");
    write(root, "modules/java.base/java/util/List.class", b"live-list");
    write(root, "modules/java.base/java/lang/Object.class", b"live-object");
    write(root, "lib/ct.sym/9ABC/java.base/java/util/List.sig", b"sig-list");
    write(root, "lib/ct.sym/9ABC/java.base/java/lang/Object.sig", b"sig-object");
    write(root, "lib/ct.sym/9A/java/util/Vector.sig", b"sig-vector");
    write(root, "lib/ct.sym/H/system-modules", b"");
    write(root, "lib/ct.sym/H/java.base/java/util/List.sig", b"sig-list-17");
}

/// Delegating view that counts full walks.
#[derive(Debug)]
pub struct CountingFs {
    inner: Arc<dyn ArchiveFs>,
    pub walks: AtomicUsize,
}

impl CountingFs {
    pub fn new(inner: Arc<dyn ArchiveFs>) -> Self {
        Self {
            inner,
            walks: AtomicUsize::new(0),
        }
    }
}

impl ArchiveFs for CountingFs {
    fn origin(&self) -> &Path {
        self.inner.origin()
    }

    fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        self.inner.read_dir(dir)
    }

    fn is_file(&self, path: &str) -> Result<bool> {
        self.inner.is_file(path)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read(path)
    }

    fn walk_files(&self, root: &str) -> Result<Vec<String>> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        self.inner.walk_files(root)
    }
}

/// Delegating view that fails every access as interrupted while the flag is set.
#[derive(Debug)]
pub struct InterruptingFs {
    inner: Arc<dyn ArchiveFs>,
    pub interrupt: AtomicBool,
}

impl InterruptingFs {
    pub fn new(inner: Arc<dyn ArchiveFs>) -> Self {
        Self {
            inner,
            interrupt: AtomicBool::new(true),
        }
    }

    fn check(&self, path: &str) -> Result<()> {
        if self.interrupt.load(Ordering::SeqCst) {
            return Err(StoreError::Interrupted {
                path: self.inner.origin().join(path),
            });
        }
        Ok(())
    }
}

impl ArchiveFs for InterruptingFs {
    fn origin(&self) -> &Path {
        self.inner.origin()
    }

    fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        self.check(dir)?;
        self.inner.read_dir(dir)
    }

    fn is_file(&self, path: &str) -> Result<bool> {
        self.check(path)?;
        self.inner.is_file(path)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.check(path)?;
        self.inner.read(path)
    }

    fn walk_files(&self, root: &str) -> Result<Vec<String>> {
        self.check(root)?;
        self.inner.walk_files(root)
    }
}
