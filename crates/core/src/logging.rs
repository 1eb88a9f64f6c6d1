//! Subscriber setup for binaries embedding the resolver.
//!
//! The library itself only emits `tracing` events; nothing is printed unless a
//! front end calls [`init_logging`].

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directory holding the rolling log files.
///
/// `JDKSTORE_LOG_DIR` wins over the default `~/.jdkstore/logs`.
pub fn log_dir() -> PathBuf {
    log_dir_from(|key| std::env::var(key).ok())
}

fn log_dir_from(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = lookup("JDKSTORE_LOG_DIR").filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jdkstore/logs")
}

/// Filter from `JDKSTORE_LOG`, then `RUST_LOG`, then `info`.
fn filter() -> EnvFilter {
    EnvFilter::try_from_env("JDKSTORE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a daily rolling file layer for `component`, plus stderr when asked.
///
/// The returned guard flushes buffered lines when dropped; keep it alive in
/// `main` (or the session owning the registry) until logging is no longer
/// needed. A second call leaves the first subscriber in place.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let log_dir = log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    // Files are named like cli.2024-01-21
    let file_appender = tracing_appender::rolling::daily(&log_dir, component);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}
