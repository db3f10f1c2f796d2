//! In-memory remote store for testing.

use crate::backend::{RemoteStore, SetOptions};
use crate::error::{ErrorKind, Result};
use crate::merge::merge_into;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;

const LAST_UPDATED_KEY: &str = "lastUpdated";

/// In-memory remote store for testing.
///
/// Documents live in a `HashMap` behind a [`RwLock`], keyed by owner. On top
/// of honouring merge semantics and stamping `lastUpdated` like a real
/// document database would, the mock can be told to fail reads or writes and
/// to add latency to every call, so callers can exercise their offline,
/// rollback and timeout paths.
pub struct MockRemoteStore {
    name: String,
    documents: RwLock<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    latency_ms: AtomicU64,
    writes: AtomicUsize,
}

impl MockRemoteStore {
    /// Create a mock remote pre-populated with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        Self {
            name: "mock".to_string(),
            documents: RwLock::new(documents.into_iter().map(|(owner, doc)| (owner.into(), doc)).collect()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock remote.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every subsequent read fail with a network error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    /// Make every subsequent write fail with a network error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::Release);
    }

    /// Number of writes that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    /// Current document for `owner`, bypassing failure injection and latency.
    pub async fn document(&self, owner: &str) -> Option<Value> {
        self.documents.read().await.get(owner).cloned()
    }

    async fn delay(&self) {
        let millis = self.latency_ms.load(Ordering::Acquire);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}
impl Default for MockRemoteStore {
    fn default() -> Self {
        Self::with_documents(std::iter::empty::<(String, Value)>())
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_document(&self, owner: &str) -> Result<Option<Value>> {
        self.delay().await;
        if self.fail_reads.load(Ordering::Acquire) {
            exn::bail!(ErrorKind::Network(format!("{}: unavailable", self.name)));
        }
        Ok(self.document(owner).await)
    }

    async fn set_document(&self, owner: &str, payload: Value, options: SetOptions) -> Result<()> {
        self.delay().await;
        if self.fail_writes.load(Ordering::Acquire) {
            exn::bail!(ErrorKind::Network(format!("{}: unavailable", self.name)));
        }
        if !payload.is_object() {
            // Document databases only hold objects at the top level.
            exn::bail!(ErrorKind::InvalidData(format!("expected an object, got {payload}")));
        }
        let stamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| ErrorKind::BackendError(format!("cannot format timestamp: {e}")))?;

        let mut guard = self.documents.write().await;
        let mut document = match (options.merge, guard.remove(owner)) {
            (true, Some(mut existing)) => {
                merge_into(&mut existing, payload);
                existing
            },
            _ => payload,
        };
        if let Value::Object(map) = &mut document {
            map.insert(LAST_UPDATED_KEY.to_string(), Value::String(stamp));
        }
        guard.insert(owner.to_string(), document);
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let remote = MockRemoteStore::default();
        assert_eq!(remote.get_document("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_merge_preserves_unrelated_fields() {
        let remote = MockRemoteStore::with_documents([(
            "u1",
            json!({"settings": {"theme": "dark"}, "watchlists": {"movies": {"watching": ["1"]}}}),
        )]);
        remote.set_document("u1", json!({"watchlists": {"movies": {"watched": ["2"]}}}), SetOptions::MERGE).await.unwrap();
        let doc = remote.document("u1").await.unwrap();
        assert_eq!(doc["settings"], json!({"theme": "dark"}));
        assert_eq!(doc["watchlists"]["movies"]["watching"], json!(["1"]));
        assert_eq!(doc["watchlists"]["movies"]["watched"], json!(["2"]));
        assert_eq!(remote.writes(), 1);
    }

    #[tokio::test]
    async fn test_replace_discards_existing() {
        let remote = MockRemoteStore::with_documents([("u1", json!({"settings": {"theme": "dark"}}))]);
        remote.set_document("u1", json!({"watchlists": {}}), SetOptions::REPLACE).await.unwrap();
        let doc = remote.document("u1").await.unwrap();
        assert!(doc.get("settings").is_none());
    }

    #[tokio::test]
    async fn test_last_updated_is_stamped() {
        let remote = MockRemoteStore::default();
        remote.set_document("u1", json!({"watchlists": {}}), SetOptions::MERGE).await.unwrap();
        let doc = remote.document("u1").await.unwrap();
        let stamp = doc[LAST_UPDATED_KEY].as_str().unwrap();
        assert!(OffsetDateTime::parse(stamp, &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let remote = MockRemoteStore::with_documents([("u1", json!({}))]);
        remote.set_fail_reads(true);
        let err = remote.get_document("u1").await.unwrap_err();
        assert!(err.is_retryable());
        remote.set_fail_reads(false);
        remote.set_fail_writes(true);
        assert!(remote.set_document("u1", json!({"a": 1}), SetOptions::MERGE).await.is_err());
        assert_eq!(remote.writes(), 0);
        assert_eq!(remote.document("u1").await, Some(json!({})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let remote = MockRemoteStore::default();
        remote.set_latency(Duration::from_secs(10));
        let read = remote.get_document("u1");
        assert!(tokio::time::timeout(Duration::from_secs(1), read).await.is_err());
    }
}
