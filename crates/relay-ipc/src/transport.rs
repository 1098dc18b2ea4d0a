//! The transport seam used by relay clients.

use crate::{Dispatcher, IpcResult};
use async_trait::async_trait;
use relay_protocol_types::{Message, Reply};

/// A request/reply channel. Each call to [`Transport::send`] posts exactly one
/// message and yields at most one reply for it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: Message) -> IpcResult<Reply>;
}

/// Transport that dispatches straight into an in-process handler table.
#[derive(Clone)]
pub struct LocalTransport {
    dispatcher: Dispatcher,
}

impl LocalTransport {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, message: Message) -> IpcResult<Reply> {
        Ok(self.dispatcher.dispatch(message).await)
    }
}
