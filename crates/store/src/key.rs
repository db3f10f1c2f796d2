//! Local store key validation.
//!
//! Keys end up as file names for file-backed stores, so anything that could
//! escape the store's root (or confuse a filesystem) is rejected for every
//! store, file-backed or not. Same key, same behaviour, regardless of where
//! the blob lives.

use crate::error::{ErrorKind, Result};

const MAX_KEY_LENGTH: usize = 200;

/// Validates a local store key.
///
/// Accepts printable ASCII without path separators, not starting with a dot
/// (which also rules out `.` and `..`), and at most 200 bytes long.
///
/// # Examples
///
/// ```
/// use binge_store::validate_key;
/// // Valid keys
/// assert!(validate_key("watchlist").is_ok());
/// assert!(validate_key("watchlist.user-42").is_ok());
/// // Invalid keys
/// assert!(validate_key("").is_err());
/// assert!(validate_key("..").is_err());
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a/b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// ```
pub fn validate(key: &str) -> Result<&str> {
    let invalid = || exn::Exn::from(ErrorKind::InvalidKey(key.escape_debug().to_string()));
    if key.is_empty() || key.len() > MAX_KEY_LENGTH || key.starts_with('.') {
        return Err(invalid());
    }
    // Yeah, that includes you, Windows.
    if key.chars().any(|c| !c.is_ascii_graphic() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')) {
        return Err(invalid());
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert_eq!(validate("watchlist").unwrap(), "watchlist");
        assert_eq!(validate("watchlist.abcDEF123").unwrap(), "watchlist.abcDEF123");
        assert_eq!(validate("a_b-c.d").unwrap(), "a_b-c.d");
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate("..").is_err());
        assert!(validate("../escape").is_err());
        assert!(validate("a/../../b").is_err());
        assert!(validate("a\\b").is_err());
        assert!(validate(".hidden").is_err());
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate("a\0b").is_err());
        assert!(validate("with space").is_err());
        assert!(validate("tab\there").is_err());
        assert!(validate("drive:").is_err());
        assert!(validate("naïve").is_err());
    }

    #[test]
    fn test_length_limit() {
        assert!(validate(&"a".repeat(MAX_KEY_LENGTH)).is_ok());
        assert!(validate(&"a".repeat(MAX_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_error_kind() {
        let err = validate("").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }
}
