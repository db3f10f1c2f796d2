//! Store traits and implementations.
//!
//! Two collaborators, two traits:
//!
//! - [`RemoteStore`]: the per-owner document living in a remote document
//!   database. Authoritative, but slow and sometimes unreachable.
//! - [`LocalStore`]: a small key/value blob store on the device, used as an
//!   offline mirror of the last known state.
//!
//! Neither trait knows anything about watchlists; they move JSON documents
//! around. Transport and storage engines are out of scope for this crate,
//! apart from the simple local stores shipped here.

mod file;
mod memory;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::file::FileLocalStore;
pub use self::memory::MemoryLocalStore;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockRemoteStore;
pub use self::ro::ReadOnlyRemote;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Options for [`RemoteStore::set_document()`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into the existing document (see [`merge_into`](crate::merge_into))
    /// instead of replacing it.
    pub merge: bool,
}
impl SetOptions {
    pub const MERGE: SetOptions = SetOptions { merge: true };
    pub const REPLACE: SetOptions = SetOptions { merge: false };
}

/// Remote per-owner document store.
///
/// # Server-assigned fields
/// Implementations stamp the document's `lastUpdated` field on every
/// successful write. Callers never send it.
///
/// # Examples
///
/// ```
/// use binge_store::{RemoteStore, SetOptions, error::Result};
/// use serde_json::json;
///
/// async fn rename_theme(remote: &dyn RemoteStore, owner: &str) -> Result<()> {
///     // Everything but `settings.theme` survives thanks to the merge.
///     let patch = json!({"settings": {"theme": "light"}});
///     remote.set_document(owner, patch, SetOptions::MERGE).await
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name of the store, used for logging only.
    fn name(&self) -> &str;

    /// Fetch the owner's document.
    ///
    /// Returns `Ok(None)` if the owner has no document yet; that is not an
    /// error.
    async fn get_document(&self, owner: &str) -> Result<Option<Value>>;

    /// Write the owner's document, creating it if needed.
    async fn set_document(&self, owner: &str, payload: Value, options: SetOptions) -> Result<()>;
}

/// Local key/value blob store.
///
/// Keys must pass [`validate_key`](crate::validate_key); implementations
/// return [`InvalidKey`](crate::error::ErrorKind::InvalidKey) otherwise.
///
/// # Examples
///
/// ```
/// use binge_store::LocalStore;
/// use binge_store::backend::MemoryLocalStore;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryLocalStore::default();
/// assert_eq!(store.get_blob("watchlist").await?, None);
/// store.set_blob("watchlist", &json!({"watchlists": {}})).await?;
/// assert!(store.get_blob("watchlist").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Name of the store, used for logging only.
    fn name(&self) -> &str;

    /// Read a blob. Returns `Ok(None)` if nothing was stored under `key`.
    async fn get_blob(&self, key: &str) -> Result<Option<Value>>;

    /// Store a blob, replacing whatever was there.
    async fn set_blob(&self, key: &str, value: &Value) -> Result<()>;
}
