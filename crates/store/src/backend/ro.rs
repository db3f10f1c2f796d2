//! Read-only remote store decorator.
//!
//! Wraps another remote store and prevents writes from reaching it, while
//! still indicating success on return.

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::SetOptions;
use crate::error::Result;
use crate::{RemoteHandle, RemoteStore};

/// Read-only remote store.
///
/// Reads are passed through; writes are silently dropped, logging an
/// [`info event`](tracing::Event). Local mirroring is the caller's business
/// and carries on as normal.
#[derive(Clone)]
pub struct ReadOnlyRemote {
    inner: RemoteHandle,
}
impl ReadOnlyRemote {
    pub fn new(inner: RemoteHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RemoteStore for ReadOnlyRemote {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_document(&self, owner: &str) -> Result<Option<Value>> {
        self.inner.get_document(owner).await
    }

    async fn set_document(&self, owner: &str, _payload: Value, options: SetOptions) -> Result<()> {
        tracing::info!(store = self.inner.name(), owner, merge = options.merge, "Skipping remote write during read-only mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockRemoteStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reads_pass_through_writes_dropped() {
        let mock = Arc::new(MockRemoteStore::with_documents([("u1", json!({"settings": {}}))]));
        let remote = ReadOnlyRemote::new(mock.clone());
        assert_eq!(remote.get_document("u1").await.unwrap(), Some(json!({"settings": {}})));
        remote.set_document("u1", json!({"watchlists": {}}), SetOptions::MERGE).await.unwrap();
        assert_eq!(mock.writes(), 0);
        assert_eq!(mock.document("u1").await, Some(json!({"settings": {}})));
    }
}
