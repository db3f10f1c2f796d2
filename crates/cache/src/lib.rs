//! In-memory cache of the active owner's watchlist.
//!
//! The cache holds exactly one [`Snapshot`](binge_model::Snapshot) at a time,
//! keyed to the owner it was loaded for. It is the only place set contents
//! are mutated; everybody else gets an immutable `Arc<Snapshot>` view.
//!
//! The cache doesn't know where snapshots come from. [`CacheStore::load()`]
//! asks a [`SnapshotSource`] (in practice the remote sync gateway) whenever
//! the requested owner isn't the cached one.

mod source;
mod store;

pub use crate::source::{SnapshotSource, SourceHandle};
pub use crate::store::CacheStore;
