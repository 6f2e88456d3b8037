//! Command envelopes.
//!
//! Inbound bodies decode to `{command, data, id?}`. Outbound messages use the
//! same shape and are MsgPack-encoded without a tag byte.

use rmpv::Value;
use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::MsgPackCodec;
use crate::error::Result;

/// Command names used by the connector itself.
pub mod command {
    pub const NEW: &str = "new";
    pub const HELLO: &str = "hello";
    pub const AUTHORIZE: &str = "authorize";
    pub const SOCIAL_PRESENCE: &str = "social.presence";
    pub const REPLAY: &str = "replay";
}

fn nil() -> Value {
    Value::Nil
}

/// Decoded inbound command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// Command name subscribers are keyed by.
    pub command: String,
    /// Command payload; `Nil` when absent.
    #[serde(default = "nil")]
    pub data: Value,
    /// Server-assigned request id.
    ///
    /// An id that is not a non-negative whole number is logged and treated
    /// as absent; the command itself is still delivered.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u64>,
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| request_id(&value)))
}

fn request_id(value: &Value) -> Option<u64> {
    if value.is_nil() {
        return None;
    }
    let id = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
            .map(|f| f as u64)
    });
    if id.is_none() {
        tracing::warn!("Ignoring unusable request id {}", value);
    }
    id
}

impl Envelope {
    /// Narrow a decoded frame payload into an envelope.
    pub fn from_value(value: Value) -> Result<Self> {
        MsgPackCodec::from_value(value)
    }

    /// Build an envelope in place (handy for tests and synthetic events).
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            data,
            id: None,
        }
    }

    /// Same envelope carrying a server id.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Outbound command.
///
/// Field order is `id, command, data`; absent fields are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct Outbound<'a, T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<'a, T: Serialize> Outbound<'a, T> {
    pub fn new(command: &'a str, data: T) -> Self {
        Self {
            id: None,
            command,
            data: Some(data),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }
}

impl<'a> Outbound<'a, ()> {
    /// A command with neither id nor data (`{command: "new"}`).
    pub fn bare(command: &'a str) -> Self {
        Self {
            id: None,
            command,
            data: None,
        }
    }
}

/// Input-handling settings sent with `authorize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handling {
    pub arr: String,
    pub das: String,
    pub sdf: String,
    pub safelock: bool,
}

impl Default for Handling {
    fn default() -> Self {
        Self {
            arr: "2".to_string(),
            das: "10".to_string(),
            sdf: "6".to_string(),
            safelock: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Commit<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Signature<'a> {
    pub commit: Commit<'a>,
}

/// `authorize` payload.
#[derive(Debug, Clone, Serialize)]
pub struct Authorize<'a> {
    pub token: &'a str,
    pub handling: &'a Handling,
    pub signature: Signature<'a>,
}

/// `social.presence` payload.
#[derive(Debug, Clone, Serialize)]
pub struct Presence<'a> {
    pub status: &'a str,
    pub detail: &'a str,
}
