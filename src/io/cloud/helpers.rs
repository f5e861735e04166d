//! Key and name helpers shared by the storage implementations and the locator.
//!
//! - [`normalize_prefix`] - Canonical `folder/` form of a configured prefix
//! - [`first_segment_after`] - Folder name directly below a prefix
//! - [`validate_resource_name`] - Validate bucket, database and table names
//! - [`validate_key_path`] - Validate object keys

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind};

// ============================================================================
// Key Helpers
// ============================================================================

/// Strip trailing slashes and append exactly one.
///
/// An empty (or all-slash) prefix stays empty so it addresses the bucket root.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// The first path segment of `key` below `prefix`, if `key` continues past it
/// with at least one more `/`.
///
/// This mirrors delimiter-based "common prefix" listing: for prefix `raw/` the
/// key `raw/2024-01-01/orders/a.csv` yields `2024-01-01`, while `raw/readme.txt`
/// yields nothing.
#[must_use]
pub fn first_segment_after<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(prefix)?;
    let (segment, _) = rest.split_once('/')?;
    (!segment.is_empty()).then_some(segment)
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate a resource name according to common cloud provider rules
///
/// # Errors
///
/// Returns an error if:
/// - The resource name is empty
/// - The resource name exceeds 255 characters
/// - The resource name contains invalid characters (only alphanumeric, hyphens, underscores, and periods are allowed)
pub fn validate_resource_name(name: &str) -> CloudResult<()> {
    if name.is_empty() {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Resource name cannot be empty",
        ));
    }

    if name.len() > 255 {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Resource name too long (max 255 characters)",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            format!("Resource name '{name}' contains invalid characters"),
        ));
    }

    Ok(())
}

/// Validate a key path (for object storage, etc.)
///
/// # Errors
///
/// Returns an error if:
/// - The key path is empty
/// - The key path starts with a forward slash
/// - The key path contains a `..` segment
pub fn validate_key_path(path: &str) -> CloudResult<()> {
    if path.is_empty() {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Key path cannot be empty",
        ));
    }

    if path.starts_with('/') {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Key path cannot start with '/'",
        ));
    }

    if path.split('/').any(|seg| seg == "..") {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            format!("Key path '{path}' cannot contain '..'"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prefix_adds_single_slash() {
        assert_eq!(normalize_prefix("raw"), "raw/");
        assert_eq!(normalize_prefix("raw///"), "raw/");
        assert_eq!(normalize_prefix("a/b/"), "a/b/");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }

    #[test]
    fn first_segment_requires_a_deeper_key() {
        assert_eq!(
            first_segment_after("raw/2024-01-01/orders/a.csv", "raw/"),
            Some("2024-01-01")
        );
        assert_eq!(first_segment_after("raw/readme.txt", "raw/"), None);
        assert_eq!(first_segment_after("raw//x", "raw/"), None);
        assert_eq!(first_segment_after("other/2024/x", "raw/"), None);
    }

    #[test]
    fn key_validation() {
        assert!(validate_key_path("a/b.csv").is_ok());
        assert!(validate_key_path("").is_err());
        assert!(validate_key_path("/a").is_err());
        assert!(validate_key_path("a/../b").is_err());
    }

    #[test]
    fn resource_name_validation() {
        assert!(validate_resource_name("analytics_staging").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("bad name").is_err());
    }
}
