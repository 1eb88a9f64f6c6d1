//! Read-only resolution of class file bytes from a JDK's module image or its
//! `ct.sym` signature archive, for any compiler target release.

pub mod cache;
pub mod config;
pub mod discover;
pub mod error;
pub mod fs;
pub mod legacy;
pub mod live;
pub mod logging;
pub mod names;
pub mod registry;
pub mod release;
pub mod store;

pub use config::{InterruptPolicy, StoreConfig};
pub use error::{Result, StoreError};
pub use registry::StoreRegistry;
pub use store::{ClassBytes, ResolvedLocation, StoreKind};
