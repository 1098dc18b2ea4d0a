//! Handler registration for the IPC server.

use crate::app::RelayState;
use crate::ipc::handlers;
use relay_ipc::IpcServer;
use tracing::info;

/// Register all IPC handlers.
pub async fn register_handlers(server: &IpcServer, state: RelayState) {
    handlers::health::register(server).await;
    handlers::request::register(server, state.clone()).await;
    handlers::reload::register(server, state.clone()).await;
    handlers::cache::register(server, state).await;

    info!("All IPC handlers registered");
}
