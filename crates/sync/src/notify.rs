//! Change notifications for UI consumers.
//!
//! Every mutation that got as far as a persistence attempt publishes one
//! [`Change`]. Consumers pick how they want to hear about it:
//!
//! - [`ChangeNotifier::subscribe()`]: every change, as it happens.
//! - [`ChangeNotifier::settled()`]: bursts coalesced into batches once
//!   things have been quiet for the debounce window. Meant for consumers
//!   that recompute from the current snapshot anyway (badges, counts).
//!
//! Consumers must be idempotent: the same snapshot may be observed more than
//! once.

use async_stream::stream;
use binge_asyncutils::DebounceExt;
use binge_model::{Category, ItemId};
use derive_more::Display;
use futures::Stream;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    #[display("add")]
    Add,
    #[display("move")]
    Move,
    #[display("remove")]
    Remove,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Persisted; the cache keeps the new state.
    #[display("applied")]
    Applied,
    /// Persisting failed; the cache is back to its pre-mutation state.
    #[display("rolled back")]
    RolledBack,
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub operation: Operation,
    pub item_id: ItemId,
    /// Category the item left, if it was in one.
    pub from: Option<Category>,
    /// Category the item joined, if any.
    pub to: Option<Category>,
    pub outcome: Outcome,
}
impl Change {
    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

/// Fan-out of [`Change`]s to any number of subscribers.
///
/// Backed by a bounded [`broadcast`] channel: a subscriber that falls more
/// than `capacity` changes behind skips the ones it missed (with a warning)
/// rather than holding everybody else up.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<Change>,
    window: Duration,
}

impl ChangeNotifier {
    pub fn new(capacity: usize, window: Duration) -> Self {
        // A zero-capacity broadcast channel panics on creation.
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, window }
    }

    /// Publish a change. Returns how many subscribers will see it; nobody
    /// listening is fine.
    pub fn publish(&self, change: Change) -> usize {
        tracing::debug!(
            operation = %change.operation,
            item = %change.item_id,
            from = ?change.from,
            to = ?change.to,
            outcome = %change.outcome,
            "Publishing change",
        );
        self.sender.send(change).unwrap_or(0)
    }

    /// Every change published from now on, one at a time.
    ///
    /// The stream ends once every notifier handle is dropped.
    pub fn subscribe(&self) -> impl Stream<Item = Change> + Send + 'static {
        changes(self.sender.subscribe())
    }

    /// Changes published from now on, in batches separated by at least the
    /// debounce window of quiet.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn settled(&self) -> impl Stream<Item = Vec<Change>> + Send + 'static {
        changes(self.sender.subscribe()).debounce(self.window)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn changes(mut receiver: broadcast::Receiver<Change>) -> impl Stream<Item = Change> + Send + 'static {
    stream! {
        loop {
            match receiver.recv().await {
                Ok(change) => yield change,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change subscriber fell behind; skipping missed changes");
                },
                Err(RecvError::Closed) => break,
            }
        }
    }
}
