//! Resolver configuration.
//!
//! Settings come from `StoreConfig::default()`, the `JDKSTORE_*` environment
//! variables, or a JSON document.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// What to do when a blocking read is interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptPolicy {
    /// Report the lookup as absent for this call only; nothing is memoized.
    #[default]
    TreatAsAbsent,
    /// Surface the interrupt to the caller as an error.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// When false every lookup goes through the linear scan and no bytes are kept.
    pub cache_enabled: bool,
    /// Modules visited by live image walks. `None` visits all of them.
    pub module_allowlist: Option<BTreeSet<String>>,
    pub interrupt_policy: InterruptPolicy,
    /// Upper bound on resident cached class bytes.
    pub byte_cache_budget: usize,
}

pub const DEFAULT_BYTE_CACHE_BUDGET: usize = 64 * 1024 * 1024;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            module_allowlist: None,
            interrupt_policy: InterruptPolicy::default(),
            byte_cache_budget: DEFAULT_BYTE_CACHE_BUDGET,
        }
    }
}

impl StoreConfig {
    /// Build a configuration from `JDKSTORE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| StoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("JDKSTORE_DISABLE_CACHE") {
            config.cache_enabled = !is_truthy(&value);
        }

        if let Some(value) = lookup("JDKSTORE_MODULES") {
            let modules: BTreeSet<String> = value
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if !modules.is_empty() {
                config.module_allowlist = Some(modules);
            }
        }

        if let Some(value) = lookup("JDKSTORE_PROPAGATE_INTERRUPTS") {
            if is_truthy(&value) {
                config.interrupt_policy = InterruptPolicy::Propagate;
            }
        }

        if let Some(megabytes) =
            lookup("JDKSTORE_BYTE_CACHE_MB").and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.byte_cache_budget = megabytes.saturating_mul(1024 * 1024);
        }

        config
    }

    /// Whether a live image walk should descend into `module`.
    pub fn allows_module(&self, module: &str) -> bool {
        self.module_allowlist
            .as_ref()
            .is_none_or(|allowed| allowed.contains(module))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
