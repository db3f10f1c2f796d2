//! Async Utility Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An async utility error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for async utility operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The queue's worker task is gone (runtime shutting down).
    #[display("operation queue is closed")]
    Closed,
    /// The queued operation panicked. The queue itself keeps running.
    #[display("queued operation panicked")]
    Panicked,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Panicked)
    }
}
