//! Error types for ribbon-client.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all ribbon operations.
#[derive(Debug, Error)]
pub enum RibbonError {
    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// Payload could not be decoded (truncated or invalid MsgPack, wrong shape).
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Leading tag byte is not one of the known frame kinds.
    #[error("Unknown frame tag: 0x{0:02X}")]
    UnknownTag(u8),

    /// Inbound message had no bytes at all.
    #[error("Empty frame")]
    EmptyFrame,

    /// WebSocket connect/send failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Server never completed the `new -> hello -> authorize` exchange.
    #[error("Handshake not completed within {0:?}")]
    HandshakeTimeout(Duration),

    /// Invalid connector configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RibbonError {
    /// True for failures of the payload codec.
    pub fn is_codec(&self) -> bool {
        matches!(self, RibbonError::Malformed(_))
    }

    /// True for framing failures (unknown tag, empty message).
    pub fn is_protocol(&self) -> bool {
        matches!(self, RibbonError::UnknownTag(_) | RibbonError::EmptyFrame)
    }
}

impl From<rmp_serde::decode::Error> for RibbonError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RibbonError::Malformed(e.to_string())
    }
}

impl From<rmpv::decode::Error> for RibbonError {
    fn from(e: rmpv::decode::Error) -> Self {
        RibbonError::Malformed(e.to_string())
    }
}

impl From<rmpv::ext::Error> for RibbonError {
    fn from(e: rmpv::ext::Error) -> Self {
        RibbonError::Malformed(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RibbonError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        RibbonError::Transport(e.to_string())
    }
}

/// Result type alias using RibbonError.
pub type Result<T> = std::result::Result<T, RibbonError>;
