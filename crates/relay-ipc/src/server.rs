//! Unix domain socket server and client.
//!
//! Framing is NDJSON: the client writes one message per line and reads exactly
//! one reply line back. A connection may carry several exchanges in sequence.

use crate::{Dispatcher, IpcError, IpcResult, Transport};
use async_trait::async_trait;
use relay_protocol_types::{Action, Message, Reply};
use std::future::Future;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// IPC server that listens on a Unix domain socket.
pub struct IpcServer {
    socket_path: String,
    dispatcher: Dispatcher,
    shutdown_tx: broadcast::Sender<()>,
}

impl IpcServer {
    /// Create a new IPC server.
    pub fn new(socket_path: &str) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            socket_path: socket_path.to_string(),
            dispatcher: Dispatcher::new(),
            shutdown_tx,
        }
    }

    /// Register a handler for an action.
    pub async fn register_handler<F, Fut>(&self, action: Action, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send + 'static,
    {
        self.dispatcher.register_handler(action, handler).await;
    }

    /// The handler table backing this server.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Get a shutdown receiver.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Get a shutdown sender (for handlers that need to trigger shutdown).
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Start the server and listen for connections.
    pub async fn run(&self) -> IpcResult<()> {
        // Subscribe before the socket appears
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // Remove existing socket file
        let socket_path = Path::new(&self.socket_path);
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path, "IPC server listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let dispatcher = self.dispatcher.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, dispatcher).await {
                                    error!(error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept error");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("IPC server shutting down");
                    break;
                }
            }
        }

        // Cleanup socket file
        let _ = std::fs::remove_file(&self.socket_path);

        Ok(())
    }
}

async fn write_reply(writer: &mut OwnedWriteHalf, reply: &Reply) -> IpcResult<()> {
    let reply_json = reply.to_json()?;
    writer.write_all(reply_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Handle a single client connection.
async fn handle_connection(stream: UnixStream, dispatcher: Dispatcher) -> IpcResult<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    debug!("Client connected");

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            debug!("Client disconnected");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let message = match Message::from_json(trimmed) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Failed to parse message");
                write_reply(&mut writer, &Reply::failure(format!("Parse error: {}", e))).await?;
                continue;
            }
        };

        debug!(action = %message.action(), "Received message");
        let reply = dispatcher.dispatch(message).await;
        write_reply(&mut writer, &reply).await?;
    }

    Ok(())
}

/// IPC client for connecting to the background process.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: String,
}

impl IpcClient {
    /// Create a new IPC client.
    pub fn new(socket_path: &str) -> Self {
        Self {
            socket_path: socket_path.to_string(),
        }
    }

    /// Send a message and wait for its reply.
    ///
    /// Each call uses its own connection, so the reply read back always
    /// belongs to the message just written.
    pub async fn call(&self, message: Message) -> IpcResult<Reply> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| IpcError::Socket(format!("Failed to connect: {}", e)))?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let message_json = message.to_json()?;
        writer.write_all(message_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let mut line = String::new();
        reader.read_line(&mut line).await?;

        if line.is_empty() {
            return Err(IpcError::ConnectionClosed);
        }

        let reply = Reply::from_json(line.trim())?;
        Ok(reply)
    }

    /// Check if the background process is running.
    pub async fn is_relay_running(&self) -> bool {
        self.call(Message::Health).await.is_ok()
    }
}

#[async_trait]
impl Transport for IpcClient {
    async fn send(&self, message: Message) -> IpcResult<Reply> {
        self.call(message).await
    }
}
