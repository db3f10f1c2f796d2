use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

pin_project! {
    /// Stream returned by [`debounce()`](DebounceExt::debounce).
    ///
    /// Items from the inner stream are buffered; a batch is yielded once no
    /// new item has arrived for `window` (trailing edge). When the inner
    /// stream ends, whatever is buffered is yielded immediately.
    #[must_use = "streams do nothing unless polled"]
    pub struct Debounce<S: Stream> {
        #[pin]
        inner: S,
        #[pin]
        timer: Sleep,
        window: Duration,
        buffered: Vec<S::Item>,
        exhausted: bool,
    }
}

impl<S: Stream> Debounce<S> {
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime (timers need one).
    pub fn new(inner: S, window: Duration) -> Self {
        Self {
            inner,
            timer: sleep(window),
            window,
            buffered: Vec::new(),
            exhausted: false,
        }
    }
}

impl<S: Stream> Stream for Debounce<S> {
    type Item = Vec<S::Item>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        // Drain everything that's ready right now, pushing the deadline back
        // on every arrival.
        while !*this.exhausted {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    this.buffered.push(item);
                    this.timer.as_mut().reset(Instant::now() + *this.window);
                },
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }
        if this.buffered.is_empty() {
            return match *this.exhausted {
                true => Poll::Ready(None),
                false => Poll::Pending,
            };
        }
        if *this.exhausted {
            return Poll::Ready(Some(std::mem::take(this.buffered)));
        }
        match this.timer.poll(cx) {
            Poll::Ready(()) => Poll::Ready(Some(std::mem::take(this.buffered))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Extension trait adding [`debounce()`](Self::debounce) to every [`Stream`].
pub trait DebounceExt: Stream + Sized {
    /// Coalesce bursts of items into `Vec` batches, emitted once the stream
    /// has been quiet for `window`.
    ///
    /// # Examples
    ///
    /// ```
    /// use binge_asyncutils::DebounceExt;
    /// use futures::StreamExt;
    /// use std::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let burst = futures::stream::iter([1, 2, 3]);
    /// let batches: Vec<Vec<i32>> = burst.debounce(Duration::from_millis(100)).collect().await;
    /// assert_eq!(batches, vec![vec![1, 2, 3]]);
    /// # }
    /// ```
    fn debounce(self, window: Duration) -> Debounce<Self> {
        Debounce::new(self, window)
    }
}
impl<S: Stream> DebounceExt for S {}
