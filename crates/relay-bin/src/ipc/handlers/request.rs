//! `tb-request` handler.

use crate::app::RelayState;
use relay_ipc::{Action, IpcServer, Message, Reply};
use tracing::info;

/// Register the request handler.
pub async fn register(server: &IpcServer, state: RelayState) {
    server
        .register_handler(Action::Request, move |message| {
            let state = state.clone();
            async move {
                let Message::Request(descriptor) = message else {
                    return Reply::failure("Expected a request message");
                };
                let executor = state.executor().await;
                executor.execute(&descriptor).await
            }
        })
        .await;

    info!("Registered request handler");
}
