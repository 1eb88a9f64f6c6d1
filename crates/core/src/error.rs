use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Interrupted while reading {}", path.display())]
    Interrupted { path: PathBuf },
    #[error("Corrupt archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },
    #[error("Invalid configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("Invalid release: {0}")]
    InvalidRelease(String),
    #[error("Invalid class file name: {0}")]
    InvalidName(String),
    #[error("No Java runtime image under {}", .0.display())]
    MissingImage(PathBuf),
}

impl StoreError {
    /// Wrap an I/O error, keeping interrupts distinguishable from real failures.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::Interrupted {
            StoreError::Interrupted { path }
        } else {
            StoreError::Io { path, source }
        }
    }

    pub fn archive(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        StoreError::Archive {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, StoreError::Interrupted { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
