use crate::error::Result;
use crate::legacy::{Layout, LegacySymbolStore};
use crate::live::LiveImageStore;
use crate::release::ReleaseCode;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A concrete file inside the store that answered a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedLocation {
    pub archive: PathBuf,
    pub path: String,
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!/{}", self.archive.display(), self.path)
    }
}

/// Raw bytes of a class or signature file and where they came from.
#[derive(Debug, Clone)]
pub struct ClassBytes {
    pub location: ResolvedLocation,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoreKind {
    LiveImage,
    LegacyFlatLayout,
    LegacyModularLayout,
}

/// The store selected for one request.
#[derive(Debug, Clone)]
pub enum Backend {
    Live(Arc<LiveImageStore>),
    Legacy {
        store: Arc<LegacySymbolStore>,
        release: ReleaseCode,
    },
}

impl Backend {
    pub fn kind(&self) -> StoreKind {
        match self {
            Backend::Live(_) => StoreKind::LiveImage,
            Backend::Legacy { store, .. } => match store.layout() {
                Layout::Flat => StoreKind::LegacyFlatLayout,
                Layout::Modular => StoreKind::LegacyModularLayout,
            },
        }
    }

    pub fn origin(&self) -> &Path {
        match self {
            Backend::Live(store) => store.origin(),
            Backend::Legacy { store, .. } => store.origin(),
        }
    }

    pub fn release(&self) -> Option<&ReleaseCode> {
        match self {
            Backend::Live(_) => None,
            Backend::Legacy { release, .. } => Some(release),
        }
    }

    /// Resolve `name` to a file in this store. `indexed` selects the
    /// index-backed lookup over the linear scan.
    pub fn locate(
        &self,
        name: &str,
        module: Option<&str>,
        indexed: bool,
    ) -> Result<Option<ResolvedLocation>> {
        let path = match (self, indexed) {
            (Backend::Live(store), true) => store.locate(name, module)?,
            (Backend::Live(store), false) => store.locate_uncached(name, module)?,
            (Backend::Legacy { store, release }, true) => store.locate(release, name, module)?,
            (Backend::Legacy { store, release }, false) => {
                store.locate_uncached(release, name, module)?
            }
        };
        Ok(path.map(|path| ResolvedLocation {
            archive: self.origin().to_path_buf(),
            path,
        }))
    }

    pub fn read(&self, location: &ResolvedLocation) -> Result<Option<Vec<u8>>> {
        match self {
            Backend::Live(store) => store.read(&location.path),
            Backend::Legacy { store, .. } => store.read(&location.path),
        }
    }
}
