//! Protocol module - tag bytes, frame classification, and command envelopes.
//!
//! - Tag table and control bytes ([`tag`])
//! - [`classify`] for inbound binary messages
//! - [`Envelope`] / [`Outbound`] command shapes

mod envelope;
mod frame;
pub mod tag;

pub use envelope::{
    command, Authorize, Commit, Envelope, Handling, Outbound, Presence, Signature,
};
pub use frame::{classify, split_batch, Frame, FrameKind, Payload};
