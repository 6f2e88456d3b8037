//! Replay stream batching.
//!
//! Input and state frames are queued with [`ReplayBuffer::append`] and sent in
//! one `replay` command per flush. A flush stamps every pending frame with the
//! current flush counter, empties the queue, and re-arms the flush timer. An
//! empty flush still goes out: it keeps the replay channel alive.
//!
//! ```text
//! append ─► pending ─flush─► {frames: [.. frame=n ..], gameid, provisioned: n}
//!                              n += 1, timer re-armed
//! ```

mod snapshot;

pub use snapshot::{initial_frames, GameOptions};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::Result;
use crate::protocol::{command, Outbound};
use crate::timer::OneShotTimer;

/// Frame type names.
pub mod kind {
    pub const FULL: &str = "full";
    pub const START: &str = "start";
    pub const KEYDOWN: &str = "keydown";
    pub const KEYUP: &str = "keyup";
}

/// One replay entry.
///
/// `sequence` is empty while pending and set at flush. The server names the
/// stamp `frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
    #[serde(rename = "frame", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl ReplayFrame {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            sequence: None,
        }
    }
}

/// Payload of one `replay` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayBatch {
    pub frames: Vec<ReplayFrame>,
    pub gameid: serde_json::Value,
    pub provisioned: u64,
}

impl ReplayBatch {
    /// Encode as a `replay` command.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Outbound::new(command::REPLAY, self).encode()
    }
}

/// Pending replay frames for one game plus the flush timer.
#[derive(Debug)]
pub struct ReplayBuffer {
    game_id: serde_json::Value,
    pending: Vec<ReplayFrame>,
    flush_count: u64,
    interval: Duration,
    timer: OneShotTimer,
    last_flush: Instant,
}

impl ReplayBuffer {
    /// `game_id` goes on the wire as given, so numeric ids stay numbers.
    pub fn new(game_id: impl Into<serde_json::Value>, interval: Duration) -> Self {
        Self {
            game_id: game_id.into(),
            pending: Vec::new(),
            flush_count: 0,
            interval,
            timer: OneShotTimer::new(),
            last_flush: Instant::now(),
        }
    }

    /// Start from a set of frames (usually [`initial_frames`]).
    pub fn with_frames(mut self, frames: impl IntoIterator<Item = ReplayFrame>) -> Self {
        self.pending.extend(frames);
        self
    }

    pub fn game_id(&self) -> &serde_json::Value {
        &self.game_id
    }

    /// Queue a frame. Any sequence it carries is overwritten at flush.
    pub fn append(&mut self, frame: ReplayFrame) {
        self.pending.push(frame);
    }

    pub fn key_down(&mut self, key: &str) {
        self.key_event(kind::KEYDOWN, key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.key_event(kind::KEYUP, key);
    }

    fn key_event(&mut self, event: &str, key: &str) {
        let data = serde_json::json!({ "key": key, "subframe": self.subframe() });
        self.append(ReplayFrame::new(event, data));
    }

    /// Time since the last flush, in the server's subframe unit.
    pub fn subframe(&self) -> f64 {
        self.last_flush.elapsed().as_secs_f64() / 60.0
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of flushes so far (the next batch's `provisioned`).
    #[inline]
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Snapshot and clear the pending frames, then re-arm the timer.
    pub fn flush(&mut self) -> ReplayBatch {
        let sequence = self.flush_count;
        let mut frames = std::mem::take(&mut self.pending);
        for frame in frames.iter_mut() {
            frame.sequence = Some(sequence);
        }

        self.flush_count += 1;
        self.last_flush = Instant::now();
        self.timer.arm(self.interval);

        ReplayBatch {
            frames,
            gameid: self.game_id.clone(),
            provisioned: sequence,
        }
    }

    /// Stop the flush timer; pending frames stay queued.
    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.timer.is_armed()
    }

    /// Resolve when the next flush is due.
    pub async fn due(&mut self) {
        self.timer.expired().await;
    }
}
