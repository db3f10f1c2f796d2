//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! None of these reach the UI-facing entry points, which degrade to stale or
//! empty data on the read path and to `false` plus a rollback notification
//! on the write path. They exist for logging and for the crate's internals.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Read path
/// - [`ErrorKind::RemoteUnavailable`]
/// - [`ErrorKind::Timeout`]
///
/// ### Write path
/// - [`ErrorKind::PersistenceFailure`]
/// - [`ErrorKind::Timeout`]
///
/// ### Plumbing
/// - [`ErrorKind::Queue`]
/// - [`ErrorKind::Config`]
/// - [`ErrorKind::LocalStore`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote store rejected or failed a request.
    #[display("remote store unavailable")]
    RemoteUnavailable,
    /// A remote request didn't resolve within the configured timeout.
    #[display("remote store timed out")]
    Timeout,
    /// A snapshot could not be persisted; the mutation must be rolled back.
    #[display("persisting watchlist failed")]
    PersistenceFailure,
    /// The local mirror could not be read or written.
    #[display("local store failure")]
    LocalStore,
    /// The operation queue is gone, or the queued operation panicked.
    #[display("operation queue failure")]
    Queue,
    /// The engine could not be built from configuration.
    #[display("invalid engine configuration")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable | Self::Timeout | Self::PersistenceFailure)
    }
}
