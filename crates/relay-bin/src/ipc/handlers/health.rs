//! Health and shutdown handlers.

use relay_ipc::{Action, IpcServer, Reply};
use tracing::info;

/// Register health and shutdown handlers.
pub async fn register(server: &IpcServer) {
    server
        .register_handler(Action::Health, |_| async move {
            Reply::with_data(serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            }))
        })
        .await;

    let shutdown_tx = server.shutdown_sender();
    server
        .register_handler(Action::Shutdown, move |_| {
            let tx = shutdown_tx.clone();
            async move {
                info!("Shutdown requested");
                let _ = tx.send(());
                Reply::with_data(serde_json::json!({ "status": "shutting_down" }))
            }
        })
        .await;

    info!("Registered health handlers");
}
