//! Liveness ping scheduling.
//!
//! The heartbeat is single-shot: when its deadline passes the connector
//! writes [`HEARTBEAT_PING`](crate::protocol::tag::HEARTBEAT_PING) once and the
//! timer stays disarmed until something re-arms it. Only two things do:
//! sending the initial `new` request, and a server heartbeat-request frame.

use std::time::Duration;

use bytes::Bytes;

use crate::protocol::tag::HEARTBEAT_PING;
use crate::timer::OneShotTimer;

/// Heartbeat scheduler owning exactly one pending ping.
#[derive(Debug)]
pub struct Heartbeat {
    timer: OneShotTimer,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            timer: OneShotTimer::new(),
            interval,
        }
    }

    /// Arm with the configured interval, replacing any pending ping.
    pub fn arm(&mut self) {
        self.arm_after(self.interval);
    }

    /// Arm with an explicit delay, replacing any pending ping.
    pub fn arm_after(&mut self, delay: Duration) {
        tracing::trace!("Heartbeat armed for {:?}", delay);
        self.timer.arm(delay);
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Resolve with the ping bytes when the deadline passes.
    ///
    /// Does not re-arm.
    pub async fn due(&mut self) -> Bytes {
        self.timer.expired().await;
        ping()
    }
}

/// The raw 2-byte ping frame.
#[inline]
pub fn ping() -> Bytes {
    Bytes::from_static(&HEARTBEAT_PING)
}
