//! Path and byte caches shared by both stores.
//!
//! Archives never change while the process runs, so a resolved path or a file's
//! bytes can be kept for the lifetime of the registry. Lookups that fail with an
//! error are never stored; "not found" is stored like any other answer.

mod once;

pub use once::OnceMap;

use crate::error::Result;
use crate::release::ReleaseCode;
use crate::store::ResolvedLocation;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Query identity for the path cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey {
    /// Archive or image the query was run against
    pub store: PathBuf,
    /// `None` for the live image
    pub release: Option<ReleaseCode>,
    pub name: String,
    pub module: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub path_entries: usize,
    pub path_hits: u64,
    pub path_misses: u64,
    pub byte_entries: usize,
    pub byte_hits: u64,
    pub byte_misses: u64,
    pub resident_bytes: usize,
    pub evictions: u64,
}

/// `(store, release, name, module)` → resolved location or absent.
#[derive(Default)]
pub struct PathCache {
    entries: OnceMap<PathKey, Option<ResolvedLocation>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PathCache {
    pub fn get_or_resolve(
        &self,
        key: PathKey,
        resolve: impl FnOnce() -> Result<Option<ResolvedLocation>>,
    ) -> Result<Option<ResolvedLocation>> {
        let mut computed = false;
        let location = self.entries.get_or_try_init(key, || {
            computed = true;
            resolve()
        })?;
        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(location)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Resolved location → file content, bounded by a byte budget.
///
/// Entries are evicted oldest first once the resident total exceeds the
/// budget. An evicted entry is simply read again on its next use.
pub struct ByteCache {
    entries: OnceMap<ResolvedLocation, Option<Arc<[u8]>>>,
    admitted: Mutex<VecDeque<(ResolvedLocation, usize)>>,
    resident: AtomicUsize,
    budget: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ByteCache {
    pub fn new(budget: usize) -> Self {
        Self {
            entries: OnceMap::new(),
            admitted: Mutex::new(VecDeque::new()),
            resident: AtomicUsize::new(0),
            budget,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get_or_load(
        &self,
        location: &ResolvedLocation,
        load: impl FnOnce() -> Result<Option<Vec<u8>>>,
    ) -> Result<Option<Arc<[u8]>>> {
        let mut computed = false;
        let bytes = self.entries.get_or_try_init(location.clone(), || {
            computed = true;
            Ok(load()?.map(Arc::from))
        })?;

        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
            if let Some(bytes) = &bytes {
                self.admit(location, bytes.len());
            }
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(bytes)
    }

    fn admit(&self, location: &ResolvedLocation, len: usize) {
        let mut admitted = self.admitted.lock().unwrap_or_else(|e| e.into_inner());
        admitted.push_back((location.clone(), len));
        let mut resident = self.resident.fetch_add(len, Ordering::Relaxed) + len;

        while resident > self.budget {
            let Some((evicted, size)) = admitted.pop_front() else {
                break;
            };
            trace!("Evicting {} ({} bytes)", evicted, size);
            self.entries.remove(&evicted);
            resident = self
                .resident
                .fetch_sub(size, Ordering::Relaxed)
                .saturating_sub(size);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn clear(&self) {
        let mut admitted = self.admitted.lock().unwrap_or_else(|e| e.into_inner());
        admitted.clear();
        self.entries.clear();
        self.resident.store(0, Ordering::Relaxed);
    }
}

/// The two cache tiers plus the global enable switch.
pub struct ContentCache {
    enabled: bool,
    pub paths: PathCache,
    pub bytes: ByteCache,
}

impl ContentCache {
    pub fn new(enabled: bool, byte_budget: usize) -> Self {
        Self {
            enabled,
            paths: PathCache::default(),
            bytes: ByteCache::new(byte_budget),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            path_entries: self.paths.entries.len(),
            path_hits: self.paths.hits.load(Ordering::Relaxed),
            path_misses: self.paths.misses.load(Ordering::Relaxed),
            byte_entries: self.bytes.entries.len(),
            byte_hits: self.bytes.hits.load(Ordering::Relaxed),
            byte_misses: self.bytes.misses.load(Ordering::Relaxed),
            resident_bytes: self.bytes.resident.load(Ordering::Relaxed),
            evictions: self.bytes.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.paths.clear();
        self.bytes.clear();
    }
}
