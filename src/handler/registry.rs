//! Command dispatcher.
//!
//! Maps command names to ordered lists of handlers. Every handler registered
//! for a command runs, in registration order. Commands nobody registered for
//! are dropped silently.
//!
//! # Example
//!
//! ```
//! use ribbon_client::handler::Dispatcher;
//! use ribbon_client::protocol::{Envelope, Handling};
//! use ribbon_client::session::Session;
//! use ribbon_client::Value;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.on("hello", |data: &Value| println!("hello: {}", data));
//!
//! let mut session = Session::new("token", Handling::default());
//! let envelope = Envelope::new("hello", Value::Nil).with_id(4);
//! assert_eq!(dispatcher.dispatch(&mut session, &envelope), 1);
//! assert_eq!(session.next_request_id(), 5);
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;

use rmpv::Value;
use serde::de::DeserializeOwned;

use crate::codec::MsgPackCodec;
use crate::error::Result;
use crate::protocol::Envelope;
use crate::session::Session;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Trait for command handlers.
pub trait Handler: Send + 'static {
    /// Handle one command payload.
    fn call(&mut self, data: &Value) -> HandlerResult;
}

/// Handler over the raw decoded payload.
pub struct ValueHandler<F>
where
    F: FnMut(&Value) + Send + 'static,
{
    handler: F,
}

impl<F> Handler for ValueHandler<F>
where
    F: FnMut(&Value) + Send + 'static,
{
    fn call(&mut self, data: &Value) -> HandlerResult {
        (self.handler)(data);
        Ok(())
    }
}

/// Wrapper that deserializes the payload before calling the handler.
pub struct TypedHandler<F, T>
where
    F: FnMut(T) + Send + 'static,
    T: DeserializeOwned + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> TypedHandler<F, T>
where
    F: FnMut(T) + Send + 'static,
    T: DeserializeOwned + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T> Handler for TypedHandler<F, T>
where
    F: FnMut(T) + Send + 'static,
    T: DeserializeOwned + 'static,
{
    fn call(&mut self, data: &Value) -> HandlerResult {
        let parsed: T = MsgPackCodec::from_value(data.clone())?;
        (self.handler)(parsed);
        Ok(())
    }
}

type CatchAll = Box<dyn FnMut(&str, &Value) + Send>;

/// Routes decoded envelopes to subscribers by command name.
#[derive(Default)]
pub struct Dispatcher {
    /// Handlers by command, in registration order.
    handlers: HashMap<String, Vec<Box<dyn Handler>>>,
    /// Handlers that see every command.
    catch_all: Vec<CatchAll>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler over the raw payload.
    pub fn on<F>(&mut self, command: &str, handler: F)
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.register(command, ValueHandler { handler });
    }

    /// Register a handler that receives the payload deserialized as `T`.
    ///
    /// If the payload does not fit `T` the failure is logged and the
    /// remaining handlers still run.
    pub fn on_typed<T, F>(&mut self, command: &str, handler: F)
    where
        T: DeserializeOwned + 'static,
        F: FnMut(T) + Send + 'static,
    {
        self.register(command, TypedHandler::new(handler));
    }

    /// Register a handler that sees every envelope.
    pub fn on_any<F>(&mut self, handler: F)
    where
        F: FnMut(&str, &Value) + Send + 'static,
    {
        self.catch_all.push(Box::new(handler));
    }

    /// Register any [`Handler`] implementation.
    pub fn register<H: Handler>(&mut self, command: &str, handler: H) {
        self.handlers
            .entry(command.to_string())
            .or_default()
            .push(Box::new(handler));
    }

    /// Number of handlers registered for `command` (catch-alls excluded).
    pub fn handler_count(&self, command: &str) -> usize {
        self.handlers.get(command).map_or(0, Vec::len)
    }

    /// Dispatch an envelope.
    ///
    /// A present `id` is recorded on the session before any handler runs.
    /// Returns the number of handlers invoked.
    pub fn dispatch(&mut self, session: &mut Session, envelope: &Envelope) -> usize {
        if let Some(id) = envelope.id {
            session.observe_id(id);
        }

        let mut invoked = 0;

        if let Some(handlers) = self.handlers.get_mut(&envelope.command) {
            for handler in handlers.iter_mut() {
                invoked += 1;
                if let Err(e) = handler.call(&envelope.data) {
                    tracing::error!("Handler error for command {}: {}", envelope.command, e);
                }
            }
        }

        for handler in self.catch_all.iter_mut() {
            invoked += 1;
            handler(&envelope.command, &envelope.data);
        }

        invoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Handling;
    use serde::Deserialize;
    use std::sync::{Arc, Mutex};

    fn session() -> Session {
        Session::new("t", Handling::default())
    }

    #[test]
    fn test_registration_order() {
        let mut dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for n in 1..=3 {
            let log = log.clone();
            dispatcher.on("tick", move |_| log.lock().unwrap().push(n));
        }

        let invoked = dispatcher.dispatch(&mut session(), &Envelope::new("tick", Value::Nil));

        assert_eq!(invoked, 3);
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(dispatcher.handler_count("tick"), 3);
    }

    #[test]
    fn test_unregistered_command_is_noop() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on("hello", |_| panic!("wrong command"));

        let invoked = dispatcher.dispatch(&mut session(), &Envelope::new("bye", Value::Nil));
        assert_eq!(invoked, 0);
    }

    #[test]
    fn test_id_recorded_before_handlers() {
        let mut dispatcher = Dispatcher::new();
        let mut session = session();
        dispatcher.on("hello", |_| {});

        dispatcher.dispatch(&mut session, &Envelope::new("hello", Value::Nil).with_id(12));
        assert_eq!(session.next_request_id(), 13);

        // unregistered commands still carry ids
        dispatcher.dispatch(&mut session, &Envelope::new("other", Value::Nil).with_id(20));
        assert_eq!(session.next_request_id(), 21);

        // no id leaves the counter alone
        dispatcher.dispatch(&mut session, &Envelope::new("hello", Value::Nil));
        assert_eq!(session.next_request_id(), 21);
    }

    #[test]
    fn test_request_id_monotonic_over_increasing_ids() {
        let mut dispatcher = Dispatcher::new();
        let mut session = session();
        let mut last = session.next_request_id();

        for id in [1, 1, 4, 9, 9, 30] {
            dispatcher.dispatch(&mut session, &Envelope::new("x", Value::Nil).with_id(id));
            assert_eq!(session.next_request_id(), id + 1);
            assert!(session.next_request_id() >= last);
            last = session.next_request_id();
        }
    }

    #[test]
    fn test_typed_handler() {
        #[derive(Deserialize)]
        struct Kick {
            reason: String,
        }

        let mut dispatcher = Dispatcher::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        dispatcher.on_typed("kick", move |kick: Kick| {
            *seen_clone.lock().unwrap() = Some(kick.reason);
        });

        let data = Value::Map(vec![(Value::from("reason"), Value::from("idle"))]);
        dispatcher.dispatch(&mut session(), &Envelope::new("kick", data));

        assert_eq!(seen.lock().unwrap().as_deref(), Some("idle"));
    }

    #[test]
    fn test_typed_mismatch_does_not_stop_others() {
        let mut dispatcher = Dispatcher::new();
        let hits = Arc::new(Mutex::new(0));

        dispatcher.on_typed("count", |_: u32| panic!("should not decode"));
        let hits_clone = hits.clone();
        dispatcher.on("count", move |_| *hits_clone.lock().unwrap() += 1);

        let invoked = dispatcher.dispatch(&mut session(), &Envelope::new("count", Value::from("x")));

        assert_eq!(invoked, 2);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_catch_all_sees_everything() {
        let mut dispatcher = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        dispatcher.on_any(move |command, _| seen_clone.lock().unwrap().push(command.to_string()));

        dispatcher.dispatch(&mut session(), &Envelope::new("a", Value::Nil));
        dispatcher.dispatch(&mut session(), &Envelope::new("b", Value::Nil));

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }
}
