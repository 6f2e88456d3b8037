//! Leading tag bytes of inbound frames.
//!
//! ```text
//! ┌──────┬──────────────────────────────────────────────┐
//! │ 0x45 │ MsgPack body                                 │  standard
//! │ 0xAE │ id (4 bytes) │ MsgPack body                  │  extracted id
//! │ 0x58 │ len u32 BE │ bytes │ len u32 BE │ bytes ...   │  batch
//! │ 0xB0 │ control byte(s)                              │  extension
//! └──────┴──────────────────────────────────────────────┘
//! ```

/// Standard frame: the whole body is one MsgPack value.
pub const STANDARD: u8 = 0x45;

/// Frame carrying a 4-byte id between the tag and the body.
pub const EXTRACTED_ID: u8 = 0xAE;

/// Batch frame: body is a run of length-prefixed sub-payloads.
pub const BATCH: u8 = 0x58;

/// Extension frame: raw control bytes, never MsgPack.
pub const EXTENSION: u8 = 0xB0;

/// Header size of an extracted-id frame (tag + 4 id bytes).
pub const EXTRACTED_ID_HEADER_SIZE: usize = 5;

/// Sequence id reported for every extracted-id frame.
pub const EXTRACTED_ID_SEQUENCE: u32 = 174;

/// Width of each length prefix inside a batch body.
pub const BATCH_LENGTH_WIDTH: usize = 4;

/// Extension control bytes.
pub mod extension {
    /// Client to server liveness ping.
    pub const PING: u8 = 0x0B;
    /// Server asks the client to (re)arm its heartbeat.
    pub const HEARTBEAT_REQUEST: u8 = 0x0C;
}

/// The raw heartbeat ping, sent without going through the codec.
pub const HEARTBEAT_PING: [u8; 2] = [EXTENSION, extension::PING];
