//! Action-keyed handler table.

use relay_protocol_types::{Action, Message, Reply};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Handler function type for relay actions.
pub type HandlerFn =
    Box<dyn Fn(Message) -> Pin<Box<dyn Future<Output = Reply> + Send>> + Send + Sync>;

/// Routes each message to the handler registered for its action.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<Action, HandlerFn>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an action, replacing any previous one.
    pub async fn register_handler<F, Fut>(&self, action: Action, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send + 'static,
    {
        let boxed_handler: HandlerFn = Box::new(move |message| Box::pin(handler(message)));
        self.handlers.write().await.insert(action, boxed_handler);
    }

    pub async fn has_handler(&self, action: Action) -> bool {
        self.handlers.read().await.contains_key(&action)
    }

    /// Produce exactly one reply for `message`.
    pub async fn dispatch(&self, message: Message) -> Reply {
        let action = message.action();
        let handlers = self.handlers.read().await;
        match handlers.get(&action) {
            Some(handler) => {
                debug!(action = %action, "Dispatching message");
                handler(message).await
            }
            None => {
                warn!(action = %action, "No handler registered");
                Reply::failure(format!("No handler registered for action {}", action))
            }
        }
    }
}
