use crate::error::{ErrorKind, Result};
use binge_asyncutils::SerialQueue;
use exn::ResultExt;

/// Serializes every operation that reads-then-writes the cache.
///
/// A thin layer over [`SerialQueue`]: queue failures are mapped into this
/// crate's errors and every operation is logged with its position in line.
#[derive(Clone, Default)]
pub struct OperationQueue {
    inner: SerialQueue,
}

impl OperationQueue {
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new() -> Self {
        Self { inner: SerialQueue::new() }
    }

    /// Run `operation` after everything submitted before it has finished.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Queue`] if the operation panicked or the queue worker is
    /// gone. The queue itself keeps serving later operations after a panic.
    pub async fn run<F, T>(&self, label: &'static str, operation: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        tracing::trace!(operation = label, ahead = self.inner.pending(), "Queueing operation");
        self.inner.enqueue(operation).await.or_raise(|| ErrorKind::Queue)
    }

    /// Operations submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.inner.pending()
    }
}
