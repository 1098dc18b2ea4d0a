//! Request relay over a [`Transport`].

use crate::{RelayError, RelayResponse, RelayResult};
use relay_ipc::{IpcClient, IpcError, Transport};
use relay_protocol_types::{Message, Reply, RequestDescriptor};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Forwards requests to the background process.
#[derive(Clone)]
pub struct Relay {
    transport: Arc<dyn Transport>,
}

impl Relay {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Relay over the background process socket.
    pub fn connect(socket_path: &str) -> Self {
        Self::new(Arc::new(IpcClient::new(socket_path)))
    }

    /// Post one `tb-request` message and rebuild the response from its reply.
    pub async fn send_request(&self, descriptor: RequestDescriptor) -> RelayResult<RelayResponse> {
        debug!(
            method = %descriptor.effective_method(),
            endpoint = %descriptor.endpoint,
            oauth = descriptor.oauth,
            "Relaying request"
        );

        let reply = self.transport.send(Message::Request(descriptor)).await?;
        let reply = check_reply(reply)?;

        match reply.response {
            Some(response) => Ok(RelayResponse::from(response)),
            None => Err(RelayError::Transport(IpcError::Protocol(
                "success reply carried no response".to_string(),
            ))),
        }
    }

    /// Post a non-request message and return its `data` payload.
    pub async fn send(&self, message: Message) -> RelayResult<Option<Value>> {
        let reply = self.transport.send(message).await?;
        Ok(check_reply(reply)?.data)
    }

    /// Ask the background process to reload its configuration.
    pub async fn reload(&self) -> RelayResult<()> {
        self.send(Message::Reload).await?;
        Ok(())
    }

    pub async fn health(&self) -> RelayResult<Value> {
        Ok(self.send(Message::Health).await?.unwrap_or(Value::Null))
    }
}

fn check_reply(reply: Reply) -> RelayResult<Reply> {
    if !reply.error {
        return Ok(reply);
    }
    Err(RelayError::Remote {
        message: reply.message.unwrap_or_default(),
        response: reply.response.map(RelayResponse::from),
    })
}
