//! Entry point resolving class bytes for a JDK home and target release.
//!
//! A `StoreRegistry` owns every cache and store handle. Sessions create their
//! own registry and pass it by reference; `StoreRegistry::global()` is the
//! process default for callers without one.

use crate::cache::{CacheStats, ContentCache, OnceMap, PathKey};
use crate::config::{InterruptPolicy, StoreConfig};
use crate::error::Result;
use crate::legacy::{LegacySymbolStore, RootSet};
use crate::live::{ImageVisitor, LiveImageStore, ModuleOwnership, NotifyMask};
use crate::names;
use crate::release::{JdkIdentity, ReleaseCode, StoreChoice, parse_release};
use crate::store::{Backend, ClassBytes};
use once_cell::sync::Lazy;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

static GLOBAL: Lazy<StoreRegistry> = Lazy::new(|| StoreRegistry::new(StoreConfig::from_env()));

pub struct StoreRegistry {
    config: StoreConfig,
    identities: OnceMap<PathBuf, Arc<JdkIdentity>>,
    live: OnceMap<PathBuf, Arc<LiveImageStore>>,
    /// `None` records a JDK without a signature archive
    legacy: OnceMap<PathBuf, Option<Arc<LegacySymbolStore>>>,
    cache: ContentCache,
}

impl StoreRegistry {
    pub fn new(config: StoreConfig) -> Self {
        let cache = ContentCache::new(config.cache_enabled, config.byte_cache_budget);
        Self {
            config,
            identities: OnceMap::new(),
            live: OnceMap::new(),
            legacy: OnceMap::new(),
            cache,
        }
    }

    /// Process-wide registry configured from the environment.
    pub fn global() -> &'static StoreRegistry {
        &GLOBAL
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Resolve the bytes of `name` for `requested_release` of the JDK at `jdk_home`.
    ///
    /// `Ok(None)` means the store has no such file, including when the JDK ships
    /// no signature archive for an older release.
    pub fn resolve_bytes(
        &self,
        jdk_home: &Path,
        requested_release: Option<&str>,
        name: &str,
        module: Option<&str>,
    ) -> Result<Option<ClassBytes>> {
        names::validate(name)?;

        let outcome = self
            .backend(jdk_home, requested_release)
            .and_then(|backend| match backend {
                Some(backend) => self.resolve_in(&backend, name, module),
                None => Ok(None),
            });

        match outcome {
            Err(e)
                if e.is_interrupted()
                    && self.config.interrupt_policy == InterruptPolicy::TreatAsAbsent =>
            {
                debug!("{}; reporting {} as absent for this call", e, name);
                Ok(None)
            }
            other => other,
        }
    }

    fn resolve_in(
        &self,
        backend: &Backend,
        name: &str,
        module: Option<&str>,
    ) -> Result<Option<ClassBytes>> {
        let location = if self.cache.is_enabled() {
            let key = PathKey {
                store: backend.origin().to_path_buf(),
                release: backend.release().cloned(),
                name: name.to_string(),
                module: module.map(str::to_string),
            };
            self.cache
                .paths
                .get_or_resolve(key, || backend.locate(name, module, true))?
        } else {
            backend.locate(name, module, false)?
        };

        let Some(location) = location else {
            trace!("{} not found in {:?} store", name, backend.kind());
            return Ok(None);
        };

        let bytes = if self.cache.is_enabled() {
            self.cache
                .bytes
                .get_or_load(&location, || backend.read(&location))?
        } else {
            backend.read(&location)?.map(Arc::from)
        };

        Ok(bytes.map(|bytes| ClassBytes { location, bytes }))
    }

    /// Pick the store answering `requested_release`, `None` when no store can.
    pub fn backend(
        &self,
        jdk_home: &Path,
        requested_release: Option<&str>,
    ) -> Result<Option<Backend>> {
        let identity = self.identity(jdk_home)?;
        let code = match identity.choose(requested_release)? {
            StoreChoice::UseLive => {
                return Ok(Some(Backend::Live(self.live_store(&identity.home)?)));
            }
            StoreChoice::UseLegacy(code) => code,
        };

        let Some(store) = self.legacy_store(&identity.home)? else {
            debug!(
                "{} ships no signature archive for release {}",
                identity.home.display(),
                code
            );
            return Ok(None);
        };

        if store.release_roots(&code)?.defers_to_live() {
            debug!(
                "Release {} is the archive's own release, using the live image",
                code
            );
            return Ok(Some(Backend::Live(self.live_store(&identity.home)?)));
        }

        Ok(Some(Backend::Legacy {
            store,
            release: code,
        }))
    }

    pub fn identity(&self, jdk_home: &Path) -> Result<Arc<JdkIdentity>> {
        let home = home_key(jdk_home);
        self.identities
            .get_or_try_init(home.clone(), || JdkIdentity::load(&home).map(Arc::new))
    }

    pub fn live_store(&self, jdk_home: &Path) -> Result<Arc<LiveImageStore>> {
        let home = home_key(jdk_home);
        self.live
            .get_or_try_init(home.clone(), || LiveImageStore::open(&home).map(Arc::new))
    }

    pub fn legacy_store(&self, jdk_home: &Path) -> Result<Option<Arc<LegacySymbolStore>>> {
        let identity = self.identity(jdk_home)?;
        self.legacy.get_or_try_init(identity.home.clone(), || -> Result<_> {
            let ct_sym = identity.home.join("lib").join("ct.sym");
            Ok(LegacySymbolStore::open(&ct_sym, identity.release)?.map(Arc::new))
        })
    }

    /// Serve `jdk_home`'s live image from `store` unless one is already open.
    pub fn attach_live(&self, jdk_home: &Path, store: Arc<LiveImageStore>) -> Arc<LiveImageStore> {
        self.live
            .get_or_try_init(home_key(jdk_home), || Ok::<_, Infallible>(store))
            .unwrap_or_else(|never| match never {})
    }

    /// Serve `jdk_home`'s signature archive from `store` unless one is already open.
    pub fn attach_legacy(
        &self,
        jdk_home: &Path,
        store: Arc<LegacySymbolStore>,
    ) -> Result<Option<Arc<LegacySymbolStore>>> {
        let identity = self.identity(jdk_home)?;
        self.legacy
            .get_or_try_init(identity.home.clone(), || Ok(Some(store)))
    }

    /// Every module declaring the package of `name` in the live image.
    pub fn modules_of(&self, jdk_home: &Path, name: &str) -> Result<ModuleOwnership> {
        Ok(self.live_store(jdk_home)?.get_modules(name))
    }

    /// Signature archive directories serving `release`, `None` without an archive.
    pub fn release_roots(&self, jdk_home: &Path, release: &str) -> Result<Option<Arc<RootSet>>> {
        let code = ReleaseCode::from_level(parse_release(release)?)?;
        match self.legacy_store(jdk_home)? {
            Some(store) => Ok(Some(store.release_roots(&code)?)),
            None => Ok(None),
        }
    }

    /// Walk the live image, limited to the configured module allowlist.
    pub fn walk_live(
        &self,
        jdk_home: &Path,
        visitor: &mut dyn ImageVisitor,
        mask: NotifyMask,
    ) -> Result<()> {
        self.live_store(jdk_home)?
            .walk(visitor, mask, &|module| self.config.allows_module(module))
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached answer and store handle.
    pub fn reset(&self) {
        self.cache.clear();
        self.identities.clear();
        self.live.clear();
        self.legacy.clear();
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn home_key(jdk_home: &Path) -> PathBuf {
    std::fs::canonicalize(jdk_home).unwrap_or_else(|_| jdk_home.to_path_buf())
}
