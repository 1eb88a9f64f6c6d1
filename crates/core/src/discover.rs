//! Locating a JDK home when the caller does not name one.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Find a JDK home from the environment and common install locations.
pub fn find_java_home() -> Option<PathBuf> {
    // 1. JAVA_HOME
    if let Ok(home) = std::env::var("JAVA_HOME") {
        let path = PathBuf::from(home);
        if is_jdk_home(&path) {
            return Some(path);
        }
    }

    // 2. macOS java_home utility
    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = Command::new("/usr/libexec/java_home").output() {
            if output.status.success() {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                let path = PathBuf::from(path_str);
                if is_jdk_home(&path) {
                    return Some(path);
                }
            }
        }
    }

    // 3. java.home reported by the java launcher on PATH
    if let Ok(output) = Command::new("java")
        .arg("-XshowSettings:properties")
        .arg("-version")
        .output()
    {
        // Settings are printed to stderr
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            if let Some(path_str) = line.trim().strip_prefix("java.home = ") {
                let path = PathBuf::from(path_str.trim());
                if is_jdk_home(&path) {
                    return Some(path);
                }
            }
        }
    }

    // 4. Common installation roots
    search_roots()
        .into_iter()
        .filter(|root| root.is_dir())
        .find_map(|root| find_in_root(&root))
}

fn search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    #[cfg(target_os = "macos")]
    {
        roots.push(PathBuf::from("/Library/Java/JavaVirtualMachines/"));
        roots.push(PathBuf::from("/opt/homebrew/opt/openjdk/"));
    }
    #[cfg(target_os = "linux")]
    {
        roots.push(PathBuf::from("/usr/lib/jvm/"));
    }
    #[cfg(target_os = "windows")]
    {
        roots.push(PathBuf::from("C:\\Program Files\\Java\\"));
    }

    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".sdkman/candidates/java/"));
    }
    roots
}

fn find_in_root(root: &Path) -> Option<PathBuf> {
    if is_jdk_home(root) {
        return Some(root.to_path_buf());
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|entry| {
            let path = entry.path();
            let bundle_home = path.join("Contents/Home");
            if bundle_home.is_dir() { bundle_home } else { path }
        })
        .filter(|path| is_jdk_home(path))
        .collect();
    // Prefer the lexically greatest, usually the newest release
    candidates.sort();
    candidates.pop()
}

/// A directory with a module image, exploded or packed.
pub fn is_jdk_home(path: &Path) -> bool {
    path.join("lib").join("modules").is_file() || path.join("modules").is_dir()
}
