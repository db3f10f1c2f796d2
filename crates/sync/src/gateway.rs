//! Remote sync gateway.
//!
//! Loads snapshots from the remote store (falling back to the local mirror)
//! and persists them to both, and owns the optimistic mutation protocol
//! every entry point goes through: [`Gateway::commit()`].

use crate::error::{ErrorKind, Result};
use crate::mutation::Mutation;
use crate::notify::{ChangeNotifier, Outcome};
use async_trait::async_trait;
use binge_cache::{CacheStore, SnapshotSource};
use binge_model::{OwnerId, Shape, Snapshot, detect, normalize, to_document};
use binge_store::{LocalHandle, RemoteHandle, SetOptions};
use exn::ResultExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(8);

pub struct Gateway {
    remote: RemoteHandle,
    local: LocalHandle,
    /// Upper bound for each remote read or write.
    timeout: Duration,
}

impl Gateway {
    pub fn new(remote: RemoteHandle, local: LocalHandle, timeout: Duration) -> Self {
        Self { remote, local, timeout }
    }

    /// Best available snapshot for `owner`.
    ///
    /// Signed-in owners are read from the remote store first; a document in
    /// either the canonical or the legacy shape is used as is, even an empty
    /// canonical one. Anything else (no document, no watchlist data, an
    /// error, a timeout) falls back to the local mirror, and a missing or
    /// unreadable mirror to an empty snapshot.
    #[tracing::instrument(level = "debug", skip(self), fields(remote = self.remote.name()))]
    pub async fn load(&self, owner: &OwnerId) -> Snapshot {
        if let OwnerId::User(id) = owner {
            match self.read_remote(id).await {
                Ok(Some(document)) => match detect(&document) {
                    Shape::Canonical => return normalize(&document),
                    Shape::Legacy => {
                        tracing::debug!("Remote document uses the legacy shape");
                        return normalize(&document);
                    },
                    Shape::Empty => tracing::debug!("Remote document has no watchlist data"),
                },
                Ok(None) => tracing::debug!("No remote document"),
                Err(e) => tracing::warn!(error = ?e, "Remote unavailable; falling back to local mirror"),
            }
        }
        self.load_local(owner).await
    }

    /// Write `snapshot` to the remote store (merging, so unrelated fields
    /// survive) and mirror it locally.
    ///
    /// The mirror is written whatever happens remotely; a failed mirror is
    /// only logged. Owners without an account have nothing but the mirror,
    /// so for them a failed mirror is the failure.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::PersistenceFailure`], wrapping a remote
    /// [`RemoteUnavailable`](ErrorKind::RemoteUnavailable) or
    /// [`Timeout`](ErrorKind::Timeout), or a [`LocalStore`](ErrorKind::LocalStore)
    /// failure for the local owner.
    #[tracing::instrument(level = "debug", skip(self, snapshot), fields(remote = self.remote.name()))]
    pub async fn persist(&self, owner: &OwnerId, snapshot: &Snapshot) -> Result<()> {
        let document = to_document(snapshot);
        let remote = match owner {
            OwnerId::User(id) => Some(self.write_remote(id, document.clone()).await),
            OwnerId::Local => None,
        };
        let mirrored = self.mirror(owner, &document).await;
        match remote {
            None => mirrored.or_raise(|| ErrorKind::PersistenceFailure),
            Some(remote) => {
                if let Err(e) = mirrored {
                    tracing::warn!(error = ?e, "Could not update local mirror");
                }
                remote.or_raise(|| ErrorKind::PersistenceFailure)
            },
        }
    }

    /// Apply `mutation` optimistically and persist the result.
    ///
    /// 1. Capture the current snapshot.
    /// 2. Apply the mutation to the cache. If nothing changed, stop here:
    ///    no persistence, no notification.
    /// 3. Persist. On success keep the new state, otherwise reinstall the
    ///    captured snapshot (and mirror it, so the mirror matches the cache).
    /// 4. Publish one [`Change`](crate::Change) with the outcome.
    ///
    /// Returns `true` only if the mutation changed something and was
    /// persisted. Must run on the operation queue.
    pub async fn commit(
        &self,
        cache: &CacheStore,
        notifier: &ChangeNotifier,
        owner: &OwnerId,
        mutation: &Mutation,
    ) -> bool {
        let (current, before) = cache.view();
        if current.as_ref() != Some(owner) {
            tracing::debug!(%owner, active = ?current, "Skipping mutation; owner is not loaded");
            return false;
        }
        if !mutation.apply(cache) {
            tracing::debug!(%owner, operation = %mutation.operation(), item = %mutation.item_id(), "Mutation changed nothing");
            return false;
        }
        let (current, after) = cache.view();
        if current.as_ref() != Some(owner) {
            // Invalidated between capture and apply; nothing of ours to persist.
            tracing::debug!(%owner, "Cache invalidated during mutation");
            return false;
        }

        let outcome = match self.persist(owner, &after).await {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                tracing::warn!(
                    %owner,
                    operation = %mutation.operation(),
                    item = %mutation.item_id(),
                    error = ?e,
                    "Rolling back mutation",
                );
                if cache.restore(owner, Arc::clone(&before))
                    && let Err(e) = self.mirror(owner, &to_document(&before)).await
                {
                    tracing::warn!(error = ?e, "Could not restore local mirror");
                }
                Outcome::RolledBack
            },
        };
        notifier.publish(mutation.change(&before, outcome));
        outcome == Outcome::Applied
    }

    async fn read_remote(&self, id: &str) -> Result<Option<Value>> {
        match timeout(self.timeout, self.remote.get_document(id)).await {
            Ok(result) => result.or_raise(|| ErrorKind::RemoteUnavailable),
            Err(_) => exn::bail!(ErrorKind::Timeout),
        }
    }

    async fn write_remote(&self, id: &str, document: Value) -> Result<()> {
        match timeout(self.timeout, self.remote.set_document(id, document, SetOptions::MERGE)).await {
            Ok(result) => result.or_raise(|| ErrorKind::RemoteUnavailable),
            Err(_) => exn::bail!(ErrorKind::Timeout),
        }
    }

    async fn load_local(&self, owner: &OwnerId) -> Snapshot {
        match self.local.get_blob(&owner.storage_key()).await {
            Ok(Some(blob)) => normalize(&blob),
            Ok(None) => Snapshot::default(),
            Err(e) => {
                tracing::warn!(store = self.local.name(), error = ?e, "Could not read local mirror");
                Snapshot::default()
            },
        }
    }

    async fn mirror(&self, owner: &OwnerId, document: &Value) -> Result<()> {
        self.local.set_blob(&owner.storage_key(), document).await.or_raise(|| ErrorKind::LocalStore)
    }
}

#[async_trait]
impl SnapshotSource for Gateway {
    async fn fetch(&self, owner: &OwnerId) -> Snapshot {
        self.load(owner).await
    }
}
