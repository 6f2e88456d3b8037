//! MsgPack codec using `rmp-serde` and `rmpv`.
//!
//! Outbound envelopes are plain serde structs and go through
//! [`MsgPackCodec::encode`]. Inbound bodies are schemaless: the server sends
//! maps with a `command` key and arbitrary `data`, so they are first read as a
//! dynamic [`Value`] and only then narrowed to typed envelopes.
//!
//! Structs are always encoded with `to_vec_named` (struct-as-map). The server
//! reads map keys, never positions.
//!
//! # Example
//!
//! ```
//! use ribbon_client::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Presence {
//!     status: String,
//!     detail: String,
//! }
//!
//! let msg = Presence { status: "online".to_string(), detail: String::new() };
//! let encoded = MsgPackCodec::encode(&msg).unwrap();
//! let decoded: Presence = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use rmpv::Value;

use crate::error::{RibbonError, Result};

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`RibbonError::Malformed`] if the bytes are truncated or do not
    /// match `T`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Encode a dynamic value.
    pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
        Self::encode(value)
    }

    /// Decode exactly one MsgPack value from `bytes`.
    ///
    /// Empty input is malformed: every tagged body carries at least one value.
    pub fn decode_value(bytes: &[u8]) -> Result<Value> {
        if bytes.is_empty() {
            return Err(RibbonError::Malformed("empty payload".to_string()));
        }
        let mut cursor = bytes;
        Ok(rmpv::decode::read_value(&mut cursor)?)
    }

    /// Narrow a dynamic value into a typed one.
    pub fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
        Ok(rmpv::ext::from_value(value)?)
    }
}
