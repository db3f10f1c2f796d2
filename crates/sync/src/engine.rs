use crate::error::{ErrorKind, Result};
use crate::gateway::{DEFAULT_REMOTE_TIMEOUT, Gateway};
use crate::identity::IdentityHandle;
use crate::mutation::Mutation;
use crate::notify::{Change, ChangeNotifier};
use crate::queue::OperationQueue;
use binge_cache::CacheStore;
use binge_config::Config;
use binge_model::{Category, ItemId, ItemRecord, OwnerId, Snapshot};
use binge_store::backend::{FileLocalStore, ReadOnlyRemote};
use binge_store::{LocalHandle, RemoteHandle};
use exn::ResultExt;
use futures::Stream;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Name the file-backed mirror is logged under.
const DEVICE_STORE_NAME: &str = "device";

/// Engine tuning. See [`Config`] for the file/environment equivalents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub remote_timeout: Duration,
    pub debounce: Duration,
    /// Changes buffered per subscriber before it starts skipping.
    pub capacity: usize,
    /// Read from the remote store, never write to it.
    pub read_only: bool,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            debounce: Duration::from_millis(100),
            capacity: 256,
            read_only: false,
        }
    }
}
impl From<&Config> for Options {
    fn from(config: &Config) -> Self {
        Self {
            remote_timeout: config.remote_timeout(),
            debounce: config.debounce_window(),
            capacity: config.notify.capacity,
            read_only: config.remote.read_only,
        }
    }
}

struct Inner {
    cache: CacheStore,
    gateway: Gateway,
    queue: OperationQueue,
    notifier: ChangeNotifier,
    identity: IdentityHandle,
}

/// The watchlist engine: what the UI talks to.
///
/// Cheap to clone; clones share one cache, queue and notifier. Every load and
/// mutation goes through the operation queue, so they take effect strictly
/// in call order and never interleave with each other's persistence.
///
/// Mutations apply to whoever the identity provider says is signed in (the
/// local-only owner when nobody is), loading that owner's watchlist first if
/// it isn't the cached one. They report `true` only when something changed
/// and was persisted; failures are rolled back and reported to subscribers,
/// never returned.
///
/// # Examples
///
/// ```
/// use binge_store::backend::{MemoryLocalStore, MockRemoteStore};
/// use binge_sync::{Category, Options, Session, Watchlist};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let watchlist = Watchlist::new(
///     Options::default(),
///     Arc::new(MockRemoteStore::default()),
///     Arc::new(MemoryLocalStore::default()),
///     Arc::new(Session::signed_in("u1")),
/// );
/// assert!(watchlist.add_item("603", Category::Wishlist, None).await);
/// assert!(watchlist.move_item("603", Category::Wishlist, Category::Watching).await);
/// assert_eq!(watchlist.snapshot().counts().watching, 1);
/// # }
/// ```
#[derive(Clone)]
pub struct Watchlist {
    inner: Arc<Inner>,
}

impl Watchlist {
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(options: Options, remote: RemoteHandle, local: LocalHandle, identity: IdentityHandle) -> Self {
        let remote: RemoteHandle = match options.read_only {
            true => Arc::new(ReadOnlyRemote::new(remote)),
            false => remote,
        };
        tracing::debug!(remote = remote.name(), local = local.name(), ?options, "Starting watchlist engine");
        let inner = Inner {
            cache: CacheStore::new(),
            gateway: Gateway::new(remote, local, options.remote_timeout),
            queue: OperationQueue::new(),
            notifier: ChangeNotifier::new(options.capacity, options.debounce),
            identity,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Build an engine mirroring to a file-backed local store in the
    /// configured directory.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Config`] if the configuration is invalid or no data
    ///   directory can be determined.
    /// - [`ErrorKind::LocalStore`] if the directory can't be used.
    pub fn from_config(config: &Config, remote: RemoteHandle, identity: IdentityHandle) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        let dir = config.local_dir().or_raise(|| ErrorKind::Config)?;
        let local = FileLocalStore::new(DEVICE_STORE_NAME, dir).or_raise(|| ErrorKind::LocalStore)?;
        Ok(Self::new(Options::from(config), remote, Arc::new(local), identity))
    }

    /// Snapshot for `owner`, from the cache if it's already loaded.
    ///
    /// Never fails: unreachable stores degrade to the local mirror, then to
    /// an empty snapshot.
    pub async fn load(&self, owner: impl Into<OwnerId>) -> Arc<Snapshot> {
        let owner = owner.into();
        let inner = Arc::clone(&self.inner);
        let operation = async move { inner.cache.load(&owner, &inner.gateway).await };
        match self.inner.queue.run("load", operation).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = ?e, "Load failed; serving cached snapshot");
                self.inner.cache.snapshot()
            },
        }
    }

    /// Put `id` in `category`, taking it out of any other. `false` if it was
    /// already there or the change couldn't be persisted.
    pub async fn add_item(&self, id: impl Into<ItemId>, category: Category, record: Option<ItemRecord>) -> bool {
        self.mutate(Mutation::Add { id: id.into(), category, record }).await
    }

    /// Move `id` between categories. `false` if it wasn't in `from`, or the
    /// change couldn't be persisted.
    pub async fn move_item(&self, id: impl Into<ItemId>, from: Category, to: Category) -> bool {
        self.mutate(Mutation::Move { id: id.into(), from, to }).await
    }

    /// Take `id` out of `category`. `false` if it wasn't there, or the change
    /// couldn't be persisted.
    pub async fn remove_item(&self, id: impl Into<ItemId>, category: Category) -> bool {
        self.mutate(Mutation::Remove { id: id.into(), category }).await
    }

    /// Metadata for `id`, if known.
    pub fn get_item_record(&self, id: &str) -> Option<ItemRecord> {
        self.inner.cache.get_item_record(id)
    }

    /// Drop the cached snapshot (on sign-out, for example). Any load in
    /// flight is discarded when it resolves.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate();
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.cache.snapshot()
    }

    /// Owner of the cached snapshot, if one is loaded.
    pub fn owner(&self) -> Option<OwnerId> {
        self.inner.cache.owner()
    }

    /// Every change from now on. See [`ChangeNotifier::subscribe()`].
    pub fn subscribe(&self) -> impl Stream<Item = Change> + Send + 'static {
        self.inner.notifier.subscribe()
    }

    /// Debounced batches of changes. See [`ChangeNotifier::settled()`].
    pub fn settled(&self) -> impl Stream<Item = Vec<Change>> + Send + 'static {
        self.inner.notifier.settled()
    }

    /// Follow the identity provider: whenever the signed-in user changes,
    /// drop the cache and load the new owner.
    ///
    /// The task stops once the engine or the identity provider is gone; abort
    /// the handle to stop it sooner.
    pub fn follow_identity(&self) -> JoinHandle<()> {
        let mut receiver = self.inner.identity.watch();
        let engine: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let owner = OwnerId::from(receiver.borrow_and_update().clone());
                let Some(inner) = engine.upgrade() else {
                    break;
                };
                tracing::info!(%owner, "Signed-in user changed");
                let watchlist = Watchlist { inner };
                watchlist.invalidate();
                watchlist.load(owner).await;
            }
            tracing::debug!("Stopped following identity");
        })
    }

    async fn mutate(&self, mutation: Mutation) -> bool {
        // An empty identifier can't be read back from a document.
        if mutation.item_id().as_str().is_empty() {
            tracing::debug!(operation = %mutation.operation(), "Ignoring mutation without an item id");
            return false;
        }
        let owner = OwnerId::from(self.inner.identity.current_owner());
        let inner = Arc::clone(&self.inner);
        let operation = async move {
            // Lazily load whoever is signed in; a no-op if they're cached.
            inner.cache.load(&owner, &inner.gateway).await;
            inner.gateway.commit(&inner.cache, &inner.notifier, &owner, &mutation).await
        };
        match self.inner.queue.run("mutate", operation).await {
            Ok(committed) => committed,
            Err(e) => {
                tracing::warn!(error = ?e, "Mutation failed");
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Session;
    use crate::notify::{Operation, Outcome};
    use binge_config::LocalConfig;
    use binge_model::{MediaKind, normalize};
    use binge_store::LocalStore;
    use binge_store::backend::{MemoryLocalStore, MockRemoteStore};
    use futures::StreamExt;
    use futures::future::join_all;
    use serde_json::{Value, json};
    use std::pin::pin;

    struct Harness {
        watchlist: Watchlist,
        remote: Arc<MockRemoteStore>,
        local: Arc<MemoryLocalStore>,
        session: Arc<Session>,
    }

    fn harness(documents: Vec<(&str, Value)>, session: Session, options: Options) -> Harness {
        let remote = Arc::new(MockRemoteStore::with_documents(documents));
        let local = Arc::new(MemoryLocalStore::default());
        let session = Arc::new(session);
        let watchlist = Watchlist::new(options, remote.clone(), local.clone(), session.clone());
        Harness { watchlist, remote, local, session }
    }

    fn signed_in(documents: Vec<(&str, Value)>) -> Harness {
        harness(documents, Session::signed_in("u1"), Options::default())
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition never became true");
    }

    #[tokio::test]
    async fn test_load_move_remove_scenario() {
        let h = signed_in(vec![("u1", json!({"watchlists": {"movies": {"watching": [{"id": 1}]}, "series": {}}}))]);
        let snapshot = h.watchlist.load("u1").await;
        assert_eq!(snapshot.ids(Category::Watching).iter().map(ItemId::as_str).collect::<Vec<_>>(), vec!["1"]);

        assert!(h.watchlist.move_item("1", Category::Watching, Category::Watched).await);
        let snapshot = h.watchlist.snapshot();
        assert!(snapshot.contains("1", Category::Watched));
        assert!(!snapshot.contains("1", Category::Watching));

        assert!(h.watchlist.remove_item("1", Category::Watched).await);
        assert!(h.watchlist.snapshot().is_empty());
        let document = h.remote.document("u1").await.unwrap();
        assert!(normalize(&document).is_empty());
    }

    #[tokio::test]
    async fn test_add_twice_is_noop() {
        let h = signed_in(vec![]);
        assert!(h.watchlist.add_item("42", Category::Wishlist, None).await);
        assert!(!h.watchlist.add_item("42", Category::Wishlist, None).await);
        assert_eq!(h.watchlist.snapshot().counts().wishlist, 1);
        assert_eq!(h.remote.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_publishes_nothing() {
        let h = signed_in(vec![]);
        h.watchlist.add_item("42", Category::Wishlist, None).await;
        let mut changes = pin!(h.watchlist.subscribe());
        assert!(!h.watchlist.move_item("42", Category::Watched, Category::Watching).await);
        assert!(!h.watchlist.remove_item("7", Category::Wishlist).await);
        assert!(tokio::time::timeout(Duration::from_secs(1), changes.next()).await.is_err());
    }

    #[tokio::test]
    async fn test_add_moves_item_out_of_other_category() {
        let h = signed_in(vec![("u1", json!({"watchlists": {"series": {"watching": ["1399"]}}}))]);
        let mut changes = pin!(h.watchlist.subscribe());
        let record = ItemRecord::new("1399", MediaKind::Series).with_title("Game of Thrones");
        assert!(h.watchlist.add_item("1399", Category::Watched, Some(record.clone())).await);
        assert_eq!(h.watchlist.snapshot().categories_of("1399"), vec![Category::Watched]);
        assert_eq!(h.watchlist.get_item_record("1399"), Some(record));

        let change = changes.next().await.unwrap();
        assert_eq!(change.operation, Operation::Add);
        assert_eq!((change.from, change.to), (Some(Category::Watching), Some(Category::Watched)));
        assert_eq!(change.outcome, Outcome::Applied);

        let document = h.remote.document("u1").await.unwrap();
        assert_eq!(document["watchlists"]["series"]["watched"][0]["title"], "Game of Thrones");
    }

    #[tokio::test]
    async fn test_round_trip_through_remote() {
        let h = signed_in(vec![]);
        h.watchlist.add_item(603u64, Category::Watching, None).await;
        h.watchlist.add_item("1399", Category::Wishlist, Some(ItemRecord::new("1399", MediaKind::Series))).await;
        let before = h.watchlist.snapshot();

        h.watchlist.invalidate();
        let after = h.watchlist.load("u1").await;
        assert_eq!(after, before);

        // A fresh device with nothing mirrored sees the same thing.
        let other = Watchlist::new(
            Options::default(),
            h.remote.clone(),
            Arc::new(MemoryLocalStore::default()),
            h.session.clone(),
        );
        assert_eq!(other.load("u1").await, before);
    }

    #[tokio::test]
    async fn test_ids_round_trip_verbatim() {
        let h = signed_in(vec![]);
        assert!(h.watchlist.add_item(" 7 ", Category::Watching, None).await);
        assert!(!h.watchlist.add_item("", Category::Watching, None).await);
        assert!(!h.watchlist.remove_item("", Category::Watching).await);
        let before = h.watchlist.snapshot();
        assert_eq!(before.ids(Category::Watching).iter().map(ItemId::as_str).collect::<Vec<_>>(), vec![" 7 "]);
        assert_eq!(h.remote.writes(), 1);

        h.watchlist.invalidate();
        assert_eq!(h.watchlist.load("u1").await, before);
    }

    #[tokio::test]
    async fn test_removing_everything_hides_legacy_lists() {
        let h = signed_in(vec![("u1", json!({"movies": {"watching": [{"tmdbId": 5}]}}))]);
        assert!(h.watchlist.load("u1").await.contains("5", Category::Watching));
        assert!(h.watchlist.remove_item("5", Category::Watching).await);

        h.watchlist.invalidate();
        assert!(h.watchlist.load("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_mirror_works_for_provider_style_user_ids() {
        let h = harness(vec![], Session::signed_in("auth0|5f7c"), Options::default());
        assert!(h.watchlist.add_item("1", Category::Watching, None).await);
        assert!(h.local.get_blob(&OwnerId::user("auth0|5f7c").storage_key()).await.unwrap().is_some());

        h.remote.set_fail_reads(true);
        h.watchlist.invalidate();
        assert!(h.watchlist.load("auth0|5f7c").await.contains("1", Category::Watching));
    }

    #[tokio::test]
    async fn test_round_trip_through_local_mirror() {
        let h = signed_in(vec![]);
        h.watchlist.add_item("1", Category::Watched, None).await;
        h.watchlist.add_item("2", Category::Watching, None).await;
        let before = h.watchlist.snapshot();

        h.remote.set_fail_reads(true);
        h.watchlist.invalidate();
        let after = h.watchlist.load("u1").await;
        assert!(after.same_members(&before));
    }

    #[tokio::test]
    async fn test_concurrent_adds_all_land() {
        let h = signed_in(vec![]);
        let adds = (0..20).map(|i| h.watchlist.add_item(format!("item-{i}"), Category::Wishlist, None));
        let results = join_all(adds).await;
        assert!(results.into_iter().all(|added| added));
        assert_eq!(h.watchlist.snapshot().counts().wishlist, 20);
        let document = h.remote.document("u1").await.unwrap();
        assert_eq!(normalize(&document).counts().wishlist, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_persist_rolls_back() {
        let h = signed_in(vec![("u1", json!({"watchlists": {"movies": {"watching": ["1"]}}}))]);
        h.watchlist.load("u1").await;
        let mut changes = pin!(h.watchlist.subscribe());
        h.remote.set_fail_writes(true);

        assert!(!h.watchlist.move_item("1", Category::Watching, Category::Watched).await);
        let snapshot = h.watchlist.snapshot();
        assert!(snapshot.contains("1", Category::Watching));
        assert!(!snapshot.contains("1", Category::Watched));

        let change = changes.next().await.unwrap();
        assert_eq!(change.outcome, Outcome::RolledBack);
        assert_eq!((change.from, change.to), (Some(Category::Watching), Some(Category::Watched)));
        assert!(tokio::time::timeout(Duration::from_secs(1), changes.next()).await.is_err());

        // The mirror follows the rollback.
        let mirror = h.local.get_blob("watchlist.u1").await.unwrap().unwrap();
        assert!(normalize(&mirror).contains("1", Category::Watching));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_rolls_back() {
        let options = Options { remote_timeout: Duration::from_secs(2), ..Options::default() };
        let h = harness(vec![], Session::signed_in("u1"), options);
        h.watchlist.load("u1").await;
        h.remote.set_latency(Duration::from_secs(30));
        let mut changes = pin!(h.watchlist.subscribe());

        assert!(!h.watchlist.add_item("1", Category::Watching, None).await);
        assert!(h.watchlist.snapshot().is_empty());
        assert_eq!(changes.next().await.map(|change| change.outcome), Some(Outcome::RolledBack));
    }

    #[tokio::test]
    async fn test_legacy_document_is_not_written_back() {
        let legacy = json!({"watching": [{"tmdbId": 5}]});
        let h = signed_in(vec![("u1", json!({"movies": legacy.clone(), "settings": {"theme": "dark"}}))]);
        assert!(h.watchlist.load("u1").await.contains("5", Category::Watching));

        assert!(h.watchlist.add_item("6", Category::Watched, None).await);
        let document = h.remote.document("u1").await.unwrap();
        assert_eq!(document["movies"], legacy);
        assert_eq!(document["settings"], json!({"theme": "dark"}));
        let canonical = normalize(&document);
        assert!(canonical.contains("5", Category::Watching));
        assert!(canonical.contains("6", Category::Watched));
    }

    #[tokio::test]
    async fn test_read_only_skips_remote_writes() {
        let options = Options { read_only: true, ..Options::default() };
        let h = harness(vec![], Session::signed_in("u1"), options);
        assert!(h.watchlist.add_item("1", Category::Watching, None).await);
        assert_eq!(h.remote.writes(), 0);
        assert!(h.local.get_blob("watchlist.u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_signed_out_mutations_stay_local() {
        let h = harness(vec![], Session::signed_out(), Options::default());
        assert!(h.watchlist.add_item("1", Category::Watching, None).await);
        assert_eq!(h.watchlist.owner(), Some(OwnerId::Local));
        assert_eq!(h.remote.writes(), 0);
        let mirror = h.local.get_blob("watchlist").await.unwrap().unwrap();
        assert!(normalize(&mirror).contains("1", Category::Watching));
    }

    #[tokio::test]
    async fn test_mutation_loads_signed_in_owner_first() {
        let h = signed_in(vec![("u1", json!({"watchlists": {"movies": {"watched": ["1"]}}}))]);
        assert!(h.watchlist.add_item("2", Category::Watching, None).await);
        let snapshot = h.watchlist.snapshot();
        assert!(snapshot.contains("1", Category::Watched));
        assert!(snapshot.contains("2", Category::Watching));
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_identity_switches_owner() {
        let h = signed_in(vec![
            ("u1", json!({"watchlists": {"movies": {"watching": ["1"]}}})),
            ("u2", json!({"watchlists": {"movies": {"watched": ["2"]}}})),
        ]);
        let task = h.watchlist.follow_identity();
        h.watchlist.load("u1").await;

        h.session.sign_in("u2");
        wait_for(|| h.watchlist.owner() == Some(OwnerId::user("u2"))).await;
        assert!(h.watchlist.snapshot().contains("2", Category::Watched));
        assert!(!h.watchlist.snapshot().contains("1", Category::Watching));

        h.session.sign_out();
        wait_for(|| h.watchlist.owner() == Some(OwnerId::Local)).await;
        assert!(h.watchlist.snapshot().is_empty());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_coalesces_bursts() {
        let h = signed_in(vec![]);
        let mut batches = pin!(h.watchlist.settled());
        for id in ["1", "2", "3"] {
            h.watchlist.add_item(id, Category::Wishlist, None).await;
        }
        let batch = batches.next().await.unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(Change::is_applied));
        assert_eq!(h.watchlist.snapshot().counts().wishlist, 3);
    }

    #[tokio::test]
    async fn test_from_config_mirrors_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            local: LocalConfig { dir: Some(dir.path().to_path_buf()) },
            ..Config::default()
        };
        let remote = Arc::new(MockRemoteStore::default());
        let watchlist = Watchlist::from_config(&config, remote, Arc::new(Session::signed_out())).unwrap();
        assert!(watchlist.add_item("1", Category::Watching, None).await);
        assert!(dir.path().join("watchlist.json").is_file());
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_config() {
        let mut config = Config::default();
        config.remote.timeout_ms = 0;
        let remote = Arc::new(MockRemoteStore::default());
        let err = Watchlist::from_config(&config, remote, Arc::new(Session::signed_out())).err().unwrap();
        assert_eq!(*err, ErrorKind::Config);
    }
}
