//! # ribbon-client
//!
//! Rust client for the ribbon realtime gateway of a multiplayer puzzle game.
//!
//! The gateway speaks binary WebSocket messages: a one-byte tag followed by
//! a MessagePack body. This crate classifies and decodes those frames, runs
//! the `new -> hello -> authorize -> social.presence` handshake, keeps the
//! connection alive with heartbeat pings, and streams gameplay replay frames
//! in periodic batches.
//!
//! ## Architecture
//!
//! - **Frames** ([`protocol`]): tag classification and batch splitting
//! - **Session** ([`session`]): request ids, connection state, handshake
//! - **Runtime** ([`Connector`]): one task owning all state, fed by a
//!   reader task and draining into a writer task
//!
//! ## Example
//!
//! ```ignore
//! use ribbon_client::{Connector, Value};
//!
//! #[tokio::main]
//! async fn main() -> ribbon_client::Result<()> {
//!     let connector = Connector::builder()
//!         .token(std::env::var("RIBBON_TOKEN").unwrap_or_default())
//!         .on("hello", |data: &Value| println!("hello: {}", data))
//!         .connect()
//!         .await?;
//!
//!     connector.wait_until_active().await?;
//!     connector.wait_for_shutdown().await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod heartbeat;
pub mod protocol;
pub mod replay;
pub mod session;
pub mod timer;
pub mod transport;
pub mod writer;

mod connector;

pub use config::ConnectorConfig;
pub use connector::{Connector, ConnectorBuilder, ConnectorHandle};
pub use error::{Result, RibbonError};
pub use protocol::Handling;
pub use replay::{ReplayBuffer, ReplayFrame};
pub use rmpv::Value;
pub use session::ConnectionState;
