//! Codec module - serialization/deserialization for payloads.
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` for typed values and
//!   `rmpv` for schemaless inbound bodies
//!
//! Codecs are marker structs with static methods rather than trait objects.
//! The heartbeat ping bypasses the codec entirely and is written as raw bytes.
//!
//! # Example
//!
//! ```
//! use ribbon_client::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
