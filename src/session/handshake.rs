//! Post-connect handshake.
//!
//! ```text
//! Init ──open/send new──► Connecting ──hello/send authorize──► Identifying
//!                                                                  │
//!                                      Active ◄──authorize/send presence
//! ```
//!
//! Each step returns the encoded reply for the connector to write. Envelopes
//! that do not advance the current state produce nothing.

use bytes::Bytes;

use super::{ConnectionState, Session};
use crate::protocol::{command, Authorize, Commit, Envelope, Outbound, Presence, Signature};
use crate::error::Result;

/// Drives `new -> hello -> authorize -> social.presence` once per connection.
#[derive(Debug, Clone)]
pub struct Handshake {
    commit_id: String,
}

impl Handshake {
    pub fn new(commit_id: impl Into<String>) -> Self {
        Self {
            commit_id: commit_id.into(),
        }
    }

    /// Socket opened: move to `Connecting` and return the `new` request.
    pub fn on_open(&self, session: &mut Session) -> Result<Bytes> {
        let bytes = Outbound::bare(command::NEW).encode()?;
        session.set_state(ConnectionState::Connecting);
        Ok(Bytes::from(bytes))
    }

    /// React to a dispatched envelope.
    ///
    /// Call after the dispatcher so `authorize` picks up any id the `hello`
    /// carried.
    pub fn on_envelope(&self, session: &mut Session, envelope: &Envelope) -> Result<Option<Bytes>> {
        match (session.state(), envelope.command.as_str()) {
            (ConnectionState::Connecting, command::HELLO) => {
                let bytes = self.authorize(session)?;
                session.set_state(ConnectionState::Identifying);
                Ok(Some(bytes))
            }
            (ConnectionState::Identifying, command::AUTHORIZE) => {
                let presence = Presence {
                    status: "online",
                    detail: "",
                };
                let bytes = Outbound::new(command::SOCIAL_PRESENCE, presence).encode()?;
                session.set_state(ConnectionState::Active);
                tracing::info!("Session authorized");
                Ok(Some(Bytes::from(bytes)))
            }
            _ => Ok(None),
        }
    }

    fn authorize(&self, session: &Session) -> Result<Bytes> {
        let data = Authorize {
            token: session.token(),
            handling: session.handling(),
            signature: Signature {
                commit: Commit {
                    id: &self.commit_id,
                },
            },
        };
        let bytes = Outbound::new(command::AUTHORIZE, data)
            .with_id(session.next_request_id())
            .encode()?;
        Ok(Bytes::from(bytes))
    }
}
