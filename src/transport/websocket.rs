//! WebSocket transport.
//!
//! Connects to the gateway and splits the socket into the two halves the
//! connector uses: a sink handed to the writer task, and a reader task that
//! forwards every binary message into a channel.
//!
//! # Example
//!
//! ```ignore
//! use ribbon_client::transport::{connect, spawn_reader_task};
//! use tokio::sync::mpsc;
//!
//! let (sink, stream) = connect("wss://tetr.io/ribbon").await?;
//! let (tx, rx) = mpsc::channel(1024);
//! let reader = spawn_reader_task(stream, tx);
//! ```

use std::fmt::Display;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{RibbonError, Result};

/// Full-duplex socket to the gateway.
pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half, owned by the writer task.
pub type SocketSink = SplitSink<Socket, Message>;

/// Read half, owned by the reader task.
pub type SocketStream = SplitStream<Socket>;

/// Open a WebSocket to `url` and split it.
pub async fn connect(url: &str) -> Result<(SocketSink, SocketStream)> {
    let (socket, response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| RibbonError::Transport(format!("connect to {} failed: {}", url, e)))?;

    tracing::debug!("Connected to {} ({})", url, response.status());

    Ok(socket.split())
}

/// Forward inbound binary messages into `tx` until the socket closes.
///
/// Text messages are logged and skipped; ping/pong is answered by
/// tungstenite itself. Dropping `tx` when the task ends tells the
/// connector the socket is gone.
pub fn spawn_reader_task<S, E>(stream: S, tx: mpsc::Sender<Bytes>) -> JoinHandle<()>
where
    S: Stream<Item = std::result::Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(reader_loop(stream, tx))
}

async fn reader_loop<S, E>(mut stream: S, tx: mpsc::Sender<Bytes>)
where
    S: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(next) = stream.next().await {
        match next {
            Ok(Message::Binary(data)) => {
                if tx.send(data).await.is_err() {
                    tracing::debug!("Connector gone, stopping reader");
                    return;
                }
            }
            Ok(Message::Text(text)) => {
                tracing::warn!("Ignoring text message ({} bytes)", text.len());
            }
            Ok(Message::Close(frame)) => {
                tracing::info!("Server closed connection: {:?}", frame);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Socket read error: {}", e);
                return;
            }
        }
    }
    tracing::info!("Socket stream ended");
}
