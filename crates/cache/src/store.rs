use crate::SnapshotSource;
use binge_model::{Category, ItemId, ItemRecord, OwnerId, Snapshot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    /// Owner the current snapshot belongs to; `None` until a load lands.
    owner: Option<OwnerId>,
    /// Owner most recently asked for. A load whose owner no longer matches
    /// this when it resolves is stale.
    requested: Option<OwnerId>,
    /// Bumped by every invalidation, so a load started before one can't be
    /// installed after it even if the same owner is requested again.
    epoch: u64,
    snapshot: Arc<Snapshot>,
}

/// Holds the active owner's snapshot and applies mutations to it.
///
/// All mutation methods are synchronous; the lock is only ever held for the
/// duration of an in-memory update, never across an `await`. Snapshots are
/// copy-on-write: views handed out by [`snapshot()`](Self::snapshot) never
/// change underneath their holder.
///
/// Mutations apply to whichever owner is loaded, and do nothing at all while
/// no owner is. Callers are expected to serialize them (see the operation
/// queue) and load the right owner first.
#[derive(Default)]
pub struct CacheStore {
    state: Mutex<State>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Nothing in here can panic halfway through an update; the data
        // behind a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot for `owner`, fetching it from `source` unless it's already
    /// cached.
    ///
    /// If a different owner is requested (or the cache is invalidated) while
    /// the fetch is in flight, the fetched snapshot is returned to this
    /// caller but not installed.
    pub async fn load(&self, owner: &OwnerId, source: &dyn SnapshotSource) -> Arc<Snapshot> {
        let epoch = {
            let mut state = self.lock();
            state.requested = Some(owner.clone());
            if state.owner.as_ref() == Some(owner) {
                tracing::trace!(%owner, "Snapshot served from cache");
                return Arc::clone(&state.snapshot);
            }
            state.epoch
        };

        let snapshot = Arc::new(source.fetch(owner).await);

        let mut state = self.lock();
        if state.epoch != epoch || state.requested.as_ref() != Some(owner) {
            tracing::debug!(%owner, "Discarding stale load");
            return snapshot;
        }
        if state.owner.as_ref() != Some(owner) {
            tracing::info!(%owner, previous = ?state.owner, "Switched active owner");
        }
        state.owner = Some(owner.clone());
        state.snapshot = Arc::clone(&snapshot);
        snapshot
    }

    /// Add `id` to `category`, taking it out of any other category first.
    ///
    /// Returns `false` (and changes nothing) if it was already in
    /// `category`. `record` is stored in the item table when given.
    pub fn add_item(&self, id: &ItemId, category: Category, record: Option<ItemRecord>) -> bool {
        self.mutate(|snapshot| {
            if snapshot.contains(id.as_str(), category) {
                return false;
            }
            for other in Category::ALL.into_iter().filter(|other| *other != category) {
                if snapshot.remove(id.as_str(), other) {
                    tracing::debug!(item = %id, from = %other, to = %category, "Item left its previous category");
                }
            }
            snapshot.insert(id.clone(), category);
            if let Some(record) = record {
                snapshot.upsert_record(record);
            }
            true
        })
    }

    /// Move `id` from one category to another.
    ///
    /// Returns `true` only if `id` was actually in `from`.
    pub fn move_item(&self, id: &ItemId, from: Category, to: Category) -> bool {
        if from == to {
            return false;
        }
        self.mutate(|snapshot| {
            if !snapshot.remove(id.as_str(), from) {
                return false;
            }
            snapshot.insert(id.clone(), to);
            true
        })
    }

    /// Remove `id` from `category`, dropping its record once nothing
    /// references it.
    pub fn remove_item(&self, id: &ItemId, category: Category) -> bool {
        self.mutate(|snapshot| {
            if !snapshot.remove(id.as_str(), category) {
                return false;
            }
            snapshot.prune_records();
            true
        })
    }

    /// Metadata for `id`. `None` means "unknown", not "not a member".
    pub fn get_item_record(&self, id: &str) -> Option<ItemRecord> {
        self.lock().snapshot.record(id).cloned()
    }

    /// Forget everything: the next [`load()`](Self::load) fetches again, and
    /// any load already in flight won't be installed.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        tracing::debug!(owner = ?state.owner, "Invalidating cache");
        state.owner = None;
        state.requested = None;
        state.epoch += 1;
        state.snapshot = Arc::default();
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.lock().snapshot)
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.lock().owner.clone()
    }

    /// Owner and snapshot, read together.
    pub fn view(&self) -> (Option<OwnerId>, Arc<Snapshot>) {
        let state = self.lock();
        (state.owner.clone(), Arc::clone(&state.snapshot))
    }

    /// Reinstall a previously captured snapshot, as long as it still belongs
    /// to the active owner. Returns whether it was reinstalled.
    pub fn restore(&self, owner: &OwnerId, snapshot: Arc<Snapshot>) -> bool {
        let mut state = self.lock();
        if state.owner.as_ref() != Some(owner) {
            tracing::debug!(%owner, active = ?state.owner, "Not restoring snapshot for inactive owner");
            return false;
        }
        state.snapshot = snapshot;
        true
    }

    fn mutate(&self, apply: impl FnOnce(&mut Snapshot) -> bool) -> bool {
        let mut state = self.lock();
        if state.owner.is_none() {
            tracing::debug!("Ignoring mutation; no owner loaded");
            return false;
        }
        // Work on a copy so holders of the current view never see a change.
        let mut draft = Snapshot::clone(&state.snapshot);
        let changed = apply(&mut draft);
        if changed {
            state.snapshot = Arc::new(draft);
        }
        changed
    }
}
