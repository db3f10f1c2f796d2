//! Watchlist synchronization engine.
//!
//! Keeps one owner's watchlist in memory and in step with a remote document
//! store and a local mirror:
//!
//! - Mutations are applied optimistically, persisted, and rolled back if
//!   persisting fails ([`Gateway::commit()`]).
//! - Every load and mutation runs on one [`OperationQueue`], so callers
//!   never interleave.
//! - Outcomes are broadcast as [`Change`]s, raw or debounced.
//!
//! [`Watchlist`] is the entry point; the pieces it's built from are public
//! for hosts that want to wire things up differently.

mod engine;
pub mod error;
mod gateway;
mod identity;
mod mutation;
mod notify;
mod queue;

pub use crate::engine::{Options, Watchlist};
pub use crate::gateway::{DEFAULT_REMOTE_TIMEOUT, Gateway};
pub use crate::identity::{IdentityHandle, IdentityProvider, Session};
pub use crate::mutation::Mutation;
pub use crate::notify::{Change, ChangeNotifier, Operation, Outcome};
pub use crate::queue::OperationQueue;
pub use binge_model::{Category, ItemId, ItemRecord, MediaKind, OwnerId, Snapshot};
