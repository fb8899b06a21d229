//! WebSocket listener and per-connection socket tasks.
//!
//! Each accepted socket splits into a reader and a writer. The reader
//! decodes frames into [`Command::Event`]s for the coordinator; the
//! writer drains the connection's outbound channel. Neither half ever
//! touches game state.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use holdout_protocol::{ClientEvent, Codec, ConnectionId, JsonCodec, ServerEvent};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::coordinator::{epoch_ms, Command, Coordinator};
use crate::{ServerConfig, ServerError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A running Holdout server: listener plus a spawned coordinator and
/// sweep timer.
pub struct Server {
    listener: TcpListener,
    commands: mpsc::UnboundedSender<Command>,
}

impl Server {
    /// Binds the listener and spawns the coordinator and sweep tasks.
    /// The server is not accepting until [`run`](Self::run) is called.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(ServerError::Bind)?;
        tracing::info!(addr = %config.bind_addr, "listener bound");

        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(Coordinator::new(config.clone(), rx).run());

        let sweep = commands.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.sweep_interval);
            loop {
                ticker.tick().await;
                if sweep.send(Command::Sweep { now_ms: epoch_ms() }).is_err() {
                    break;
                }
            }
        });

        Ok(Self { listener, commands })
    }

    /// The bound address; useful when binding to port 0 in tests.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the process is terminated.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("holdout server running");
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let commands = self.commands.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_socket(stream, commands).await {
                            tracing::debug!(%addr, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Drives one socket from handshake to close.
async fn handle_socket(
    stream: TcpStream,
    commands: mpsc::UnboundedSender<Command>,
) -> Result<(), ServerError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| ServerError::Accept(std::io::Error::other(e)))?;
    let conn = ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    tracing::debug!(%conn, "websocket accepted");

    let (mut sink, mut source) = ws.split();
    let (sender, mut outbound) = mpsc::unbounded_channel::<ServerEvent>();

    // Attach registers the outbound channel; the coordinator owns the
    // sending half from here on.
    if commands.send(Command::Attach { conn, sender }).is_err() {
        return Ok(());
    }

    // Writer: drains until the coordinator drops the sender on Detach.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let frame = match JsonCodec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(%conn, error = %e, "encode failed, event skipped");
                    continue;
                }
            };
            let text = match String::from_utf8(frame) {
                Ok(text) => text,
                Err(_) => continue,
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader: decode frames into commands until the socket closes.
    while let Some(message) = source.next().await {
        let data = match message {
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Binary(data)) => data.to_vec(),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue, // ping/pong/frame
        };
        match JsonCodec.decode::<ClientEvent>(&data) {
            Ok(event) => {
                if commands.send(Command::Event { conn, event }).is_err() {
                    break;
                }
            }
            Err(e) => {
                // Malformed frames are dropped, not fatal.
                tracing::debug!(%conn, error = %e, "undecodable frame dropped");
            }
        }
    }

    let _ = commands.send(Command::Detach { conn });
    let _ = writer.await;
    tracing::debug!(%conn, "websocket closed");
    Ok(())
}
