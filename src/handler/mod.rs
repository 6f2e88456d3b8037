//! Handler module - command subscription and dispatch.
//!
//! Provides [`Dispatcher`], which maps command names to handlers. The
//! connector composes one dispatcher and feeds it every decoded envelope.
//!
//! # Example
//!
//! ```
//! use ribbon_client::handler::Dispatcher;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Kick {
//!     reason: String,
//! }
//!
//! let mut dispatcher = Dispatcher::new();
//!
//! // Raw payload
//! dispatcher.on("hello", |data| println!("hello {}", data));
//!
//! // Typed payload
//! dispatcher.on_typed("kick", |kick: Kick| println!("kicked: {}", kick.reason));
//! ```

mod registry;

pub use registry::{Dispatcher, Handler, HandlerResult, TypedHandler, ValueHandler};
