//! Per-connection session state.
//!
//! The [`Session`] carries credentials, the handling config, the request-id
//! counter, and the connection state. The connector task owns it and passes it
//! by `&mut` to the two things allowed to change it: the dispatcher (request
//! ids) and the [`Handshake`] (state).

mod handshake;

pub use handshake::Handshake;

use crate::protocol::Handling;

/// Where the connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket not yet open.
    Init,
    /// `new` sent, waiting for `hello`.
    Connecting,
    /// `authorize` sent, waiting for the ack.
    Identifying,
    /// Handshake complete.
    Active,
    /// Handshake did not complete in time.
    Failed,
    /// Socket closed or disconnected.
    Closed,
}

impl ConnectionState {
    /// No further transitions happen from here.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

/// Session-scoped protocol state.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    handling: Handling,
    next_request_id: u64,
    state: ConnectionState,
}

impl Session {
    /// First id used before the server assigns any.
    pub const INITIAL_REQUEST_ID: u64 = 1;

    pub fn new(token: impl Into<String>, handling: Handling) -> Self {
        Self {
            token: token.into(),
            handling,
            next_request_id: Self::INITIAL_REQUEST_ID,
            state: ConnectionState::Init,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn handling(&self) -> &Handling {
        &self.handling
    }

    #[inline]
    pub fn next_request_id(&self) -> u64 {
        self.next_request_id
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!("Session state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Record a server-supplied id: the next request uses `id + 1`.
    pub(crate) fn observe_id(&mut self, id: u64) {
        let next = id.saturating_add(1);
        if next < self.next_request_id {
            tracing::warn!(
                "Server id {} moves request id backwards from {}",
                id,
                self.next_request_id
            );
        }
        self.next_request_id = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::new("token", Handling::default());
        assert_eq!(session.next_request_id(), 1);
        assert_eq!(session.state(), ConnectionState::Init);
        assert_eq!(session.token(), "token");
    }

    #[test]
    fn test_observe_id() {
        let mut session = Session::new("t", Handling::default());
        session.observe_id(41);
        assert_eq!(session.next_request_id(), 42);
        session.observe_id(u64::MAX);
        assert_eq!(session.next_request_id(), u64::MAX);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionState::Failed.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Active.is_terminal());
    }
}
