//! Connector configuration.

use std::time::Duration;

use crate::error::{RibbonError, Result};
use crate::protocol::Handling;

/// Default ribbon gateway.
pub const DEFAULT_GATEWAY: &str = "wss://tetr.io/ribbon";

/// Default delay before the liveness ping.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(5000);

/// Default replay flush period.
pub const DEFAULT_REPLAY_INTERVAL: Duration = Duration::from_millis(500);

/// Default time allowed for `new -> hello -> authorize`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build identifier sent in the `authorize` signature.
pub const DEFAULT_COMMIT_ID: &str = "2d05c95";

/// Default capacity of the inbound, outbound, and command channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for a connector.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// WebSocket URL.
    pub gateway: String,
    /// Session token sent with `authorize`.
    pub token: String,
    /// Input-handling settings sent with `authorize`.
    pub handling: Handling,
    /// Heartbeat ping delay.
    pub heartbeat_interval: Duration,
    /// Replay flush period.
    pub replay_interval: Duration,
    /// Handshake deadline; `None` waits forever.
    pub handshake_timeout: Option<Duration>,
    /// Build identifier for the `authorize` signature.
    pub commit_id: String,
    /// Channel capacity.
    pub channel_capacity: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            gateway: DEFAULT_GATEWAY.to_string(),
            token: String::new(),
            handling: Handling::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            replay_interval: DEFAULT_REPLAY_INTERVAL,
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            commit_id: DEFAULT_COMMIT_ID.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ConnectorConfig {
    /// Reject values the connector cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(RibbonError::Config("heartbeat interval must be > 0".into()));
        }
        if self.replay_interval.is_zero() {
            return Err(RibbonError::Config("replay interval must be > 0".into()));
        }
        if self.handshake_timeout.is_some_and(|t| t.is_zero()) {
            return Err(RibbonError::Config("handshake timeout must be > 0".into()));
        }
        if self.channel_capacity == 0 {
            return Err(RibbonError::Config("channel capacity must be > 0".into()));
        }
        Ok(())
    }
}
