//! Helpers for slash-separated binary class file names.

use crate::error::{Result, StoreError};
use std::borrow::Cow;

pub const CLASS_SUFFIX: &str = ".class";
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Reject names that cannot address a file inside a store.
pub fn validate(name: &str) -> Result<()> {
    let has_suffix = name.ends_with(CLASS_SUFFIX) || name.ends_with(SIGNATURE_SUFFIX);
    let well_formed = !name.starts_with('/')
        && !name.contains('\\')
        && name.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if has_suffix && well_formed {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Package portion of a file name in slash form, empty for the default package.
pub fn package_of(name: &str) -> &str {
    name.rfind('/').map(|idx| &name[..idx]).unwrap_or("")
}

/// The name as the live image stores it.
pub fn as_class_file(name: &str) -> Cow<'_, str> {
    match name.strip_suffix(SIGNATURE_SUFFIX) {
        Some(stem) => Cow::Owned(format!("{stem}{CLASS_SUFFIX}")),
        None => Cow::Borrowed(name),
    }
}

/// The name as the legacy archive stores it.
pub fn as_signature_file(name: &str) -> Cow<'_, str> {
    match name.strip_suffix(CLASS_SUFFIX) {
        Some(stem) => Cow::Owned(format!("{stem}{SIGNATURE_SUFFIX}")),
        None => Cow::Borrowed(name),
    }
}

/// Join archive path segments with `/`, skipping empty ones.
pub fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(validate("java/util/List.class").is_ok());
        assert!(validate("java/util/List.sig").is_ok());
        assert!(validate("Toplevel.class").is_ok());
        assert!(validate("java/util/List").is_err());
        assert!(validate("/java/util/List.class").is_err());
        assert!(validate("java//List.class").is_err());
        assert!(validate("../secret/List.class").is_err());
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("java/util/List.class"), "java/util");
        assert_eq!(package_of("Toplevel.class"), "");
    }

    #[test]
    fn test_suffix_rewrites() {
        assert_eq!(as_class_file("java/util/List.sig"), "java/util/List.class");
        assert_eq!(as_class_file("java/util/List.class"), "java/util/List.class");
        assert_eq!(as_signature_file("java/util/List.class"), "java/util/List.sig");
        assert_eq!(as_signature_file("java/util/List.sig"), "java/util/List.sig");
    }

    #[test]
    fn test_join_skips_empty_segments() {
        assert_eq!(join(&["9ABC", "", "java/util/List.sig"]), "9ABC/java/util/List.sig");
        assert_eq!(join(&["modules", "java.base"]), "modules/java.base");
    }
}
