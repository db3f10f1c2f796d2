//! Small async building blocks that don't belong to any one crate.
//!
//! - [`SerialQueue`]: run futures strictly one after another, in submission
//!   order, on a dedicated worker task.
//! - [`Debounce`]: coalesce bursts of stream items into batches once the
//!   stream has been quiet for a given window.
//!
//! Both need a Tokio runtime (the queue spawns its worker, the debouncer
//! uses Tokio timers).

mod debounce;
pub mod error;
mod queue;

pub use crate::debounce::{Debounce, DebounceExt};
pub use crate::queue::SerialQueue;
