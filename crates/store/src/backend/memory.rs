//! In-memory local store.

use crate::backend::LocalStore;
use crate::error::Result;
use crate::key::validate as validate_key;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Local store that forgets everything when dropped.
///
/// Used when nothing should outlive the process (tests, ephemeral guest
/// sessions). Keys are validated exactly like the file-backed store does.
pub struct MemoryLocalStore {
    name: String,
    blobs: RwLock<HashMap<String, Value>>,
}

impl MemoryLocalStore {
    /// Create a store pre-populated with blobs.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then
    /// test should not pass.
    pub fn with_blobs(blobs: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        let mut map = HashMap::new();
        for (key, value) in blobs {
            let key = key.into();
            if validate_key(&key).is_err() {
                panic!("MemoryLocalStore::with_blobs: invalid key {key:?}");
            }
            map.insert(key, value);
        }
        Self {
            name: "memory".to_string(),
            blobs: RwLock::new(map),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
impl Default for MemoryLocalStore {
    fn default() -> Self {
        let blobs: [(&str, Value); 0] = [];
        Self::with_blobs(blobs)
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_blob(&self, key: &str) -> Result<Option<Value>> {
        let key = validate_key(key)?;
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn set_blob(&self, key: &str, value: &Value) -> Result<()> {
        let key = validate_key(key)?;
        self.blobs.write().await.insert(key.to_string(), value.clone());
        Ok(())
    }
}
