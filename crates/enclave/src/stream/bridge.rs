//! Push-side bridge for callback-driven transports.
//!
//! A transport that reports its call through `data` / `error` / `end`
//! callbacks gets a [`LineSink`] and calls the matching method from each
//! callback. The consumer side is an ordinary [`ResponseStream`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, watch};

use super::ResponseStream;
use crate::error::ClientError;
use crate::line::ResponseLine;

/// Events a push transport emits. One slot of buffering keeps the sink in
/// lock-step with the consumer.
enum Event {
    Data(ResponseLine),
    Error(ClientError),
    End,
}

/// Create a connected sink / stream pair.
///
/// The stream cancels (see [`ResponseStream::close`]) by signalling the
/// sink: [`LineSink::cancelled`] resolves and further sends are refused.
/// Transports that need to tear down more than their forwarding loop can
/// attach further hooks with [`ResponseStream::on_cancel`].
pub fn channel() -> (LineSink, ResponseStream) {
    let (tx, rx) = mpsc::channel(1);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let sink = LineSink {
        tx,
        cancel_tx: Arc::new(cancel_tx),
        cancel_rx,
        terminated: Arc::new(AtomicBool::new(false)),
    };

    let lines = futures::stream::unfold(Some(rx), |rx| async move {
        let mut rx = rx?;
        match rx.recv().await {
            Some(Event::Data(line)) => Some((Ok(line), Some(rx))),
            Some(Event::Error(err)) => Some((Err(err), None)),
            Some(Event::End) => None,
            None => Some((Err(ClientError::Incomplete), None)),
        }
    });

    // Only the watch sender goes into the hook: holding `tx` here would keep
    // the channel open after every producer is gone.
    let cancel_tx = Arc::clone(&sink.cancel_tx);
    let stream = ResponseStream::from_stream(lines).on_cancel(move || {
        cancel_tx.send_replace(true);
    });
    (sink, stream)
}

/// Producer half of [`channel`]. Cheap to clone, so each transport callback
/// can own one.
#[derive(Clone)]
pub struct LineSink {
    tx: mpsc::Sender<Event>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    terminated: Arc<AtomicBool>,
}

impl fmt::Debug for LineSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSink")
            .field("terminated", &self.terminated.load(Ordering::Relaxed))
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl LineSink {
    /// Forward one line. Waits until the consumer has room for it.
    ///
    /// Returns `false` if the line was not delivered because the stream
    /// already terminated or the consumer went away; the transport should
    /// stop producing.
    pub async fn data(&self, line: ResponseLine) -> bool {
        if self.terminated.load(Ordering::Acquire) {
            tracing::debug!(kind = line.kind(), "dropping line sent after terminal signal");
            return false;
        }
        self.send(Event::Data(line)).await
    }

    /// Terminate the stream with a transport error. Returns at once if the
    /// consumer closed the stream.
    pub async fn error(&self, err: ClientError) {
        if !self.terminate("error") {
            return;
        }
        self.send(Event::Error(err)).await;
    }

    /// Terminate the stream gracefully. Returns at once if the consumer
    /// closed the stream.
    pub async fn end(&self) {
        if !self.terminate("end") {
            return;
        }
        self.send(Event::End).await;
    }

    /// Deliver `event` unless the consumer cancels first.
    async fn send(&self, event: Event) -> bool {
        if self.is_closed() {
            return false;
        }
        tokio::select! {
            biased;
            () = self.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    /// Signal cancellation to every clone of this sink.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// True once the consumer cancelled or dropped the stream.
    pub fn is_closed(&self) -> bool {
        *self.cancel_rx.borrow() || self.tx.is_closed()
    }

    /// Resolves when the consumer cancels or drops the stream.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.tx.closed() => {}
            _ = self.wait_cancel() => {}
        }
    }

    async fn wait_cancel(&self) {
        let mut rx = self.cancel_rx.clone();
        let sender_gone = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if sender_gone {
            std::future::pending::<()>().await;
        }
    }

    /// First terminal signal wins; later ones are dropped.
    fn terminate(&self, signal: &'static str) -> bool {
        if self.terminated.swap(true, Ordering::AcqRel) {
            tracing::debug!(signal, "suppressing duplicate terminal signal");
            return false;
        }
        true
    }
}
