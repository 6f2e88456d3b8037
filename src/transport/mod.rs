//! Transport module - WebSocket connection to the gateway.

mod websocket;

pub use websocket::{connect, spawn_reader_task, Socket, SocketSink, SocketStream};
