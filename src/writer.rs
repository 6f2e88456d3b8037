//! Dedicated writer task for outbound messages.
//!
//! Every write (encoded commands, heartbeat pings, replay batches) goes
//! through one mpsc channel into one task that owns the socket sink.
//!
//! ```text
//! connector task ─► WriterHandle ─► mpsc ─► writer task ─► WebSocket sink
//! ```
//!
//! Sends are fire-and-forget: [`WriterHandle::send`] never waits. A full or
//! closed channel is reported to the caller, who logs it and moves on.
//! The writer task feeds everything already queued into the sink before
//! flushing, so bursts cost one flush.

use std::fmt::Display;

use bytes::Bytes;
use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{RibbonError, Result};

/// Maximum messages fed before a flush.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for queueing outbound binary messages.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Bytes>,
}

impl WriterHandle {
    /// Create a handle and the receiving end it feeds.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Wrap an existing sender.
    pub fn from_sender(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Queue one message without waiting.
    pub fn send(&self, message: Bytes) -> Result<()> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                RibbonError::Transport("outbound queue full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => RibbonError::ConnectionClosed,
        })
    }

    /// Queue one message, logging instead of returning failures.
    pub fn send_logged(&self, message: Bytes, what: &str) {
        if let Err(e) = self.send(message) {
            tracing::warn!("Dropped outbound {}: {}", what, e);
        }
    }

    /// True once the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task over a WebSocket sink.
///
/// The task ends cleanly when every [`WriterHandle`] is dropped, and with
/// [`RibbonError::Transport`] if the sink fails.
pub fn spawn_writer_task<S>(sink: S, rx: mpsc::Receiver<Bytes>) -> JoinHandle<Result<()>>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    tokio::spawn(writer_loop(rx, sink))
}

async fn writer_loop<S>(mut rx: mpsc::Receiver<Bytes>, mut sink: S) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    loop {
        let first = match rx.recv().await {
            Some(m) => m,
            None => {
                // All handles dropped: close the socket politely.
                let _ = sink.close().await;
                return Ok(());
            }
        };

        sink.feed(Message::binary(first)).await.map_err(transport)?;

        let mut fed = 1;
        while fed < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(m) => {
                    sink.feed(Message::binary(m)).await.map_err(transport)?;
                    fed += 1;
                }
                Err(_) => break,
            }
        }

        sink.flush().await.map_err(transport)?;
    }
}

fn transport<E: Display>(e: E) -> RibbonError {
    RibbonError::Transport(e.to_string())
}
