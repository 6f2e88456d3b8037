//! Single cancelable deadline.
//!
//! A [`OneShotTimer`] holds at most one pending deadline. Arming replaces the
//! previous deadline; nothing ever stacks. The owner polls [`OneShotTimer::expired`]
//! from its `select!` loop.

use std::future::pending;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug, Default)]
pub struct OneShotTimer {
    deadline: Option<Instant>,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the timer `delay` from now, discarding any earlier deadline.
    ///
    /// A delay past the end of the clock leaves the timer disarmed: it would
    /// never fire anyway.
    pub fn arm(&mut self, delay: Duration) {
        self.deadline = Instant::now().checked_add(delay);
        if self.deadline.is_none() {
            tracing::debug!("Delay {:?} out of clock range, timer left disarmed", delay);
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolve once the deadline passes, disarming the timer.
    ///
    /// Never resolves while disarmed. Cancel safe: dropping the future before
    /// it resolves leaves the deadline in place.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => pending::<()>().await,
        }
    }
}
