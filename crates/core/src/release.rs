//! JDK identity and release selection.
//!
//! A JDK home is identified by the `JAVA_VERSION` line of its `release` file.
//! Requested compiler releases are compared against it to decide whether the
//! live runtime image or the legacy `ct.sym` archive answers a query.

use crate::error::{Result, StoreError};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Highest release level expressible as a single archive digit.
const MAX_RELEASE_LEVEL: u32 = 35;

/// Identity of a JDK home directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JdkIdentity {
    pub home: PathBuf,
    /// Version string exactly as published by the JDK, e.g. `17.0.2` or `1.8.0_05`.
    pub version: String,
    /// Normalized feature release, e.g. 8 or 17.
    pub release: u32,
}

/// Which store answers a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChoice {
    UseLive,
    UseLegacy(ReleaseCode),
}

impl JdkIdentity {
    /// Read `<home>/release`, falling back to the directory name.
    pub fn load(home: &Path) -> Result<Self> {
        let version = match std::fs::read_to_string(home.join("release")) {
            Ok(content) => java_version_from_release_file(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(StoreError::io(home.join("release"), e)),
        }
        .or_else(|| java_version_from_path(home))
        .ok_or_else(|| {
            StoreError::InvalidRelease(format!("cannot determine version of {}", home.display()))
        })?;

        let release = parse_release(&version)?;
        Ok(Self {
            home: home.to_path_buf(),
            version,
            release,
        })
    }

    /// Decide the backing store for `requested`.
    ///
    /// No requested release, or one equal to this JDK's release, is served by
    /// the live image.
    pub fn choose(&self, requested: Option<&str>) -> Result<StoreChoice> {
        let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(StoreChoice::UseLive);
        };
        let level = parse_release(requested)?;
        if level == self.release {
            Ok(StoreChoice::UseLive)
        } else {
            Ok(StoreChoice::UseLegacy(ReleaseCode::from_level(level)?))
        }
    }
}

/// Normalize a version string to its feature release.
///
/// `1.8.0_05` → 8, `17.0.2` → 17, `9-ea` → 9.
pub fn parse_release(version: &str) -> Result<u32> {
    let trimmed = version.trim().trim_matches('"');
    let significant = trimmed.strip_prefix("1.").unwrap_or(trimmed);
    let digits: String = significant
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse::<u32>()
        .ok()
        .filter(|level| *level > 0)
        .ok_or_else(|| StoreError::InvalidRelease(version.to_string()))
}

fn java_version_from_release_file(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.strip_prefix("JAVA_VERSION=")
            .map(|v| v.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

fn java_version_from_path(home: &Path) -> Option<String> {
    let name = home.file_name()?.to_string_lossy();
    Regex::new(r"jdk-?(\d+(?:\.\d+)*)")
        .ok()
        .and_then(|re| re.captures(&name))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Archive token naming a release inside `ct.sym` directory names.
///
/// One uppercase base-36 digit per release: `8`, `9`, `A` (10), `B` (11), ...
/// A directory such as `9ABC` serves every release whose code it contains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ReleaseCode(String);

impl ReleaseCode {
    pub fn from_level(level: u32) -> Result<Self> {
        if level == 0 || level > MAX_RELEASE_LEVEL {
            return Err(StoreError::InvalidRelease(level.to_string()));
        }
        let digit = char::from_digit(level, 36)
            .ok_or_else(|| StoreError::InvalidRelease(level.to_string()))?;
        Ok(Self(digit.to_ascii_uppercase().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a top-level archive directory serves this release.
    ///
    /// Names containing `-` are metadata directories and never match.
    pub fn matches_dir(&self, dir_name: &str) -> bool {
        !dir_name.contains('-') && dir_name.contains(self.0.as_str())
    }
}

impl fmt::Display for ReleaseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
