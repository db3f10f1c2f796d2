use std::fmt::{Display, Formatter, Result as FmtResult};

/// Who a snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerId {
    /// Nobody is signed in; state only lives in the local store.
    Local,
    /// A signed-in user, by the identity provider's user id.
    User(String),
}

impl OwnerId {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// Key for this owner's mirror in a local store.
    ///
    /// Short user ids made of ASCII letters, digits, `-` and `_` are used as
    /// is (`watchlist.<id>`). Anything else is replaced by its BLAKE3 hash
    /// behind a `~`, which plain ids can't contain.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Local => "watchlist".to_string(),
            Self::User(id) if is_key_safe(id) => format!("watchlist.{id}"),
            Self::User(id) => format!("watchlist.~{}", blake3::hash(id.as_bytes())),
        }
    }
}

const MAX_PLAIN_ID_LENGTH: usize = 64;

fn is_key_safe(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_PLAIN_ID_LENGTH
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'))
}

impl From<Option<String>> for OwnerId {
    fn from(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.trim().is_empty() => Self::User(id),
            _ => Self::Local,
        }
    }
}
impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Some(id.to_string()).into()
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Local => f.write_str("(local)"),
            Self::User(id) => f.write_str(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_user_is_local() {
        assert_eq!(OwnerId::from(None), OwnerId::Local);
        assert_eq!(OwnerId::from(Some("  ".to_string())), OwnerId::Local);
        assert_eq!(OwnerId::from("u1"), OwnerId::user("u1"));
    }

    #[test]
    fn test_storage_keys_do_not_collide() {
        assert_ne!(OwnerId::Local.storage_key(), OwnerId::user("local").storage_key());
        assert_eq!(OwnerId::user("u1").storage_key(), "watchlist.u1");
    }

    #[test]
    fn test_unsafe_user_ids_are_hashed() {
        let key = OwnerId::user("auth0|5f7c").storage_key();
        assert_eq!(key, format!("watchlist.~{}", blake3::hash(b"auth0|5f7c")));
        assert!(key.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'~')));
        assert_ne!(key, OwnerId::user("auth0|5f7d").storage_key());

        let long = "x".repeat(65);
        for id in ["a.b", "with space", "naïve", long.as_str()] {
            assert!(OwnerId::user(id).storage_key().starts_with("watchlist.~"), "{id}");
        }
        assert_eq!(OwnerId::user("x".repeat(64)).storage_key(), format!("watchlist.{}", "x".repeat(64)));
    }
}
