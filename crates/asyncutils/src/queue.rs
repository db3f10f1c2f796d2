use crate::error::{ErrorKind, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};

type Job = BoxFuture<'static, ()>;

/// A FIFO queue of futures, executed one at a time.
///
/// Every future handed to [`enqueue()`](Self::enqueue) is shipped to a single
/// worker task which awaits them in submission order; the next one does not
/// start until the previous one has completed (including everything it awaits
/// internally).
///
/// Because the work happens on the worker and not in the caller's future,
/// an operation keeps running to completion even if the caller stops waiting
/// for it (dropped future, timeout, etc.). Half-finished operations are never
/// abandoned.
///
/// A panicking operation is caught and reported to its caller as
/// [`ErrorKind::Panicked`]; the worker carries on with the next one.
///
/// # Examples
///
/// ```
/// use binge_asyncutils::SerialQueue;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = SerialQueue::new();
/// let answer = queue.enqueue(async { 6 * 7 }).await.unwrap();
/// assert_eq!(answer, 42);
/// # }
/// ```
#[derive(Clone)]
pub struct SerialQueue {
    sender: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

impl SerialQueue {
    /// Create a queue and spawn its worker.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime (same as
    /// [`tokio::spawn`]).
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job.await;
                counter.fetch_sub(1, Ordering::AcqRel);
            }
            tracing::debug!("Serial queue worker finished");
        });
        Self { sender, pending }
    }

    /// Number of operations submitted but not yet completed (including the
    /// one currently running).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Submit an operation and wait for its output.
    ///
    /// The operation is placed at the back of the queue the first time the
    /// returned future is polled.
    ///
    /// # Errors
    /// - [`ErrorKind::Panicked`] if the operation panicked.
    /// - [`ErrorKind::Closed`] if the worker is no longer running.
    pub async fn enqueue<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job = async move {
            let outcome = AssertUnwindSafe(operation).catch_unwind().await;
            // Nobody listening any more is fine; the work is done either way.
            _ = reply.send(outcome.map_err(|_| ErrorKind::Panicked));
        }
        .boxed();

        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            exn::bail!(ErrorKind::Closed);
        }
        match response.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(kind)) => Err(exn::Exn::from(kind)),
            Err(_) => Err(exn::Exn::from(ErrorKind::Closed)),
        }
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}
