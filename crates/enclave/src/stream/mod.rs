//! Transport stream bridge.
//!
//! Transports deliver response lines in two shapes. A native gRPC client
//! hands back a pull-based stream; a callback-driven client pushes `data`,
//! `error` and `end` events at us. Both are presented to the rest of the
//! crate as one [`ResponseStream`]:
//!
//! ```text
//! Streaming --(data)*--> Streaming --(end | error)--> Closed
//!     \                                                 ^
//!      `--------------- close() / drop -----------------'
//! ```
//!
//! - Lines are forwarded one for one, in transport order, with no queue of
//!   our own.
//! - Exactly one terminal signal reaches the consumer. A transport that
//!   reports both `error` and `end`, or reports either twice, has the extra
//!   signals dropped.
//! - Closing the stream (explicitly, through a [`CancelHandle`], or by
//!   dropping it) before a terminal signal cancels the underlying call
//!   exactly once. Closing again is a no-op.
//!
//! Use [`ResponseStream::from_stream`] for pull-based transports and
//! [`channel`] for push-based ones.

mod bridge;

pub use bridge::{LineSink, channel};

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use futures::stream::BoxStream;
use futures::task::AtomicWaker;

use crate::error::ClientError;
use crate::line::ResponseLine;

/// Item type of every response stream.
pub type LineResult = Result<ResponseLine, ClientError>;

type CancelFn = Box<dyn FnOnce() + Send>;

type Upstream = BoxStream<'static, LineResult>;

const STREAMING: u8 = 0;
const FINISHED: u8 = 1;
const CANCELLED: u8 = 2;

/// State shared between a stream and its cancel handles.
struct Shared {
    state: AtomicU8,
    upstream: Mutex<Option<Upstream>>,
    cancel: Mutex<Option<CancelFn>>,
    waker: AtomicWaker,
}

impl Shared {
    fn new(upstream: Upstream) -> Self {
        Self {
            state: AtomicU8::new(STREAMING),
            upstream: Mutex::new(Some(upstream)),
            cancel: Mutex::new(None),
            waker: AtomicWaker::new(),
        }
    }

    fn upstream(&self) -> MutexGuard<'_, Option<Upstream>> {
        self.upstream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_cancel(&self) -> Option<CancelFn> {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Streaming -> Cancelled. Drops the transport stream and fires the
    /// cancel hook if this call made the transition; otherwise does nothing.
    fn cancel(&self) {
        if self
            .state
            .compare_exchange(STREAMING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        tracing::debug!("response stream closed by consumer, cancelling call");
        // Released outside the lock: dropping a tonic `Streaming` resets the call.
        let upstream = self.upstream().take();
        drop(upstream);
        if let Some(cancel) = self.take_cancel() {
            cancel();
        }
        self.waker.wake();
    }

    /// Streaming -> Finished, after the transport sent its terminal signal.
    /// The cancel hook is dropped unused.
    fn finish(&self) {
        if self
            .state
            .compare_exchange(STREAMING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            drop(self.take_cancel());
        }
    }

    fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }
}

/// A lazy, single-pass, cancellable sequence of [`ResponseLine`]s.
///
/// Yields `Ok` lines until the transport finishes. A transport failure is
/// yielded as one `Err` item, after which the stream is exhausted; so is a
/// consumer-side cancellation ([`ClientError::Cancelled`]).
pub struct ResponseStream {
    shared: Arc<Shared>,
    exhausted: bool,
}

impl fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream")
            .field("state", &self.shared.state.load(Ordering::Relaxed))
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl ResponseStream {
    /// Wrap a pull-based transport stream.
    ///
    /// Closing drops `stream` on the spot, which is how pull-based clients
    /// such as tonic abort the call. Attach an extra hook with
    /// [`Self::on_cancel`].
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = LineResult> + Send + 'static,
    {
        Self {
            shared: Arc::new(Shared::new(Box::pin(stream))),
            exhausted: false,
        }
    }

    /// Run `hook` (once) if the consumer closes the stream before it
    /// finishes. Hooks run in the order they were attached.
    pub fn on_cancel<F>(self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut slot = self
                .shared
                .cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let chained: CancelFn = match slot.take() {
                Some(previous) => Box::new(move || {
                    previous();
                    hook();
                }),
                None => Box::new(hook),
            };
            *slot = Some(chained);
        }
        self
    }

    /// A handle that can close this stream from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Close the stream. Cancels the underlying call if it is still running;
    /// a no-op if the stream already finished or was closed.
    pub fn close(&mut self) {
        self.shared.cancel();
    }

    /// True once the transport has sent its terminal signal or the stream was
    /// closed.
    pub fn is_closed(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) != STREAMING
    }
}

impl Stream for ResponseStream {
    type Item = LineResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.exhausted {
            return Poll::Ready(None);
        }

        this.shared.waker.register(cx.waker());
        let mut upstream = this.shared.upstream();
        let polled = match upstream.as_mut() {
            Some(inner) if !this.shared.is_cancelled() => Some(inner.as_mut().poll_next(cx)),
            // Closed; `cancel` has taken the upstream or is about to.
            _ => None,
        };
        let Some(polled) = polled else {
            drop(upstream);
            this.exhausted = true;
            return Poll::Ready(Some(Err(ClientError::Cancelled)));
        };

        let item = match polled {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Some(Ok(line))) => {
                tracing::trace!(kind = line.kind(), "response line");
                return Poll::Ready(Some(Ok(line)));
            }
            Poll::Ready(Some(Err(err))) => {
                tracing::debug!(error = %err, "response stream failed");
                Some(Err(err))
            }
            Poll::Ready(None) => {
                tracing::debug!("response stream ended");
                None
            }
        };
        let finished = upstream.take();
        drop(upstream);
        drop(finished);
        this.shared.finish();
        this.exhausted = true;
        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }
        match self.shared.upstream().as_ref() {
            // One extra item if the consumer cancels.
            Some(inner) => (0, inner.size_hint().1.and_then(|upper| upper.checked_add(1))),
            None => (0, Some(1)),
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

/// Closes a [`ResponseStream`] from another task.
///
/// The stream's next poll yields [`ClientError::Cancelled`]. Closing twice,
/// or after the stream finished, does nothing.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").finish_non_exhaustive()
    }
}

impl CancelHandle {
    /// Close the stream this handle belongs to.
    pub fn close(&self) {
        self.shared.cancel();
    }

    /// True if the stream was closed by its consumer.
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    fn counting_hook() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&count);
        (count, move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn info(msg: &str) -> LineResult {
        Ok(ResponseLine::Info(msg.to_string()))
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// A never-ending upstream that reports when it is released.
    fn watched_upstream() -> (Arc<AtomicBool>, impl Stream<Item = LineResult> + Send + 'static) {
        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(Arc::clone(&dropped));
        let upstream = futures::stream::pending::<LineResult>().map(move |item| {
            let _keep = &guard;
            item
        });
        (dropped, upstream)
    }

    #[tokio::test]
    async fn test_forwards_lines_in_order() {
        let lines = vec![info("a"), info("b"), info("c")];
        let stream = ResponseStream::from_stream(futures::stream::iter(lines));
        let got: Vec<_> = stream.map(|l| l.unwrap()).collect().await;
        assert_eq!(
            got,
            vec![
                ResponseLine::Info("a".into()),
                ResponseLine::Info("b".into()),
                ResponseLine::Info("c".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_is_terminal() {
        let lines = vec![
            info("a"),
            Err(ClientError::transport("reading", "boom")),
            info("after"),
        ];
        let mut stream = ResponseStream::from_stream(futures::stream::iter(lines));
        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await,
            Some(Err(ClientError::Transport { .. }))
        ));
        assert!(stream.next().await.is_none());
        assert!(stream.is_closed());
    }

    #[tokio::test]
    async fn test_close_twice_cancels_once() {
        let (count, hook) = counting_hook();
        let mut stream =
            ResponseStream::from_stream(futures::stream::pending::<LineResult>()).on_cancel(hook);
        stream.close();
        stream.close();
        drop(stream);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_after_end_does_not_cancel() {
        let (count, hook) = counting_hook();
        let mut stream = ResponseStream::from_stream(futures::stream::iter(vec![info("a")]))
            .on_cancel(hook);
        while stream.next().await.is_some() {}
        stream.close();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_cancels_running_call() {
        let (count, hook) = counting_hook();
        let stream =
            ResponseStream::from_stream(futures::stream::pending::<LineResult>()).on_cancel(hook);
        drop(stream);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_releases_upstream_immediately() {
        let (dropped, upstream) = watched_upstream();
        let mut stream = ResponseStream::from_stream(upstream);
        stream.close();
        assert!(dropped.load(Ordering::SeqCst));

        let mut next = task::spawn(stream.next());
        let item = assert_ready!(next.poll());
        assert!(matches!(item, Some(Err(ClientError::Cancelled))));
    }

    #[test]
    fn test_cancel_handle_releases_upstream_while_pending() {
        let (dropped, upstream) = watched_upstream();
        let mut stream = ResponseStream::from_stream(upstream);
        let handle = stream.cancel_handle();
        {
            let mut next = task::spawn(stream.next());
            assert_pending!(next.poll());
        }
        handle.close();
        assert!(dropped.load(Ordering::SeqCst));
        assert!(stream.is_closed());

        let mut next = task::spawn(stream.next());
        let item = assert_ready!(next.poll());
        assert!(matches!(item, Some(Err(ClientError::Cancelled))));
        drop(next);
        let mut after = task::spawn(stream.next());
        assert!(assert_ready!(after.poll()).is_none());
    }

    #[test]
    fn test_cancel_handle_wakes_pending_consumer() {
        let (count, hook) = counting_hook();
        let mut stream =
            ResponseStream::from_stream(futures::stream::pending::<LineResult>()).on_cancel(hook);
        let handle = stream.cancel_handle();

        let mut next = task::spawn(stream.next());
        assert_pending!(next.poll());

        handle.close();
        handle.close();
        assert!(next.is_woken());
        let item = assert_ready!(next.poll());
        assert!(matches!(item, Some(Err(ClientError::Cancelled))));
        drop(next);

        let mut after = task::spawn(stream.next());
        assert!(assert_ready!(after.poll()).is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_cancelled());
    }
}
