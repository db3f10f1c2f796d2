//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A provider (file or environment) could not be read or extracted
    #[display("cannot load configuration: {_0}")]
    Load(#[error(not(source))] String),
    /// Configuration was read but a value is out of range
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// No `local.dir` configured and the platform has no data directory
    #[display("no data directory available; set local.dir")]
    NoDataDir,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
