//! `tb-reload` handler.

use crate::app::RelayState;
use relay_ipc::{Action, IpcServer, Reply};
use tracing::{info, warn};

/// Register the reload handler.
pub async fn register(server: &IpcServer, state: RelayState) {
    server
        .register_handler(Action::Reload, move |_| {
            let state = state.clone();
            async move {
                match state.reload().await {
                    Ok(()) => Reply::with_data(serde_json::json!({ "reloaded": true })),
                    Err(e) => {
                        warn!(error = %e, "Reload failed");
                        Reply::failure(format!("Reload failed: {}", e))
                    }
                }
            }
        })
        .await;

    info!("Registered reload handler");
}
