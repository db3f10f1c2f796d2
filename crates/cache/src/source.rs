use async_trait::async_trait;
use binge_model::{OwnerId, Snapshot};
use std::sync::Arc;

pub type SourceHandle = Arc<dyn SnapshotSource + Send + Sync>;

/// Somewhere a snapshot for an owner can be fetched from.
///
/// Fetching is infallible from the cache's point of view: a source degrades
/// to whatever data it can find (ultimately an empty snapshot) rather than
/// failing the load.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, owner: &OwnerId) -> Snapshot;
}
