//! Relay initialization.

use crate::app::RelayState;
use crate::ipc::register_handlers;
use relay_config_and_utils::{Config, Paths};
use relay_ipc::{IpcClient, IpcServer};
use relay_storage::FileCacheStorage;
use std::sync::Arc;
use tracing::{info, warn};

/// Run the relay until a shutdown message or Ctrl-C.
pub async fn run_relay(config: Config, paths: Paths) -> Result<(), Box<dyn std::error::Error>> {
    // Singleton enforcement: check if the relay is already running
    let socket_path = paths.socket_file();
    if socket_path.exists() {
        let client = IpcClient::new(&socket_path.to_string_lossy());
        if client.is_relay_running().await {
            eprintln!("Error: tbrelay is already running. Use 'tbrelay stop' to stop it first.");
            std::process::exit(1);
        }
        warn!(path = %socket_path.display(), "Removing stale socket file");
        let _ = std::fs::remove_file(&socket_path);
    }

    let pid_file = paths.pid_file();
    if pid_file.exists() {
        let _ = std::fs::remove_file(&pid_file);
    }

    info!("Starting tbrelay");
    info!(
        api_base_url = %config.api_base_url,
        oauth_base_url = %config.oauth_base_url,
        user_agent = %config.user_agent,
        cache_ttl_secs = config.cache_ttl_secs,
        "Configuration loaded"
    );

    paths.ensure_dirs()?;
    if Config::write_default_if_missing(&paths)? {
        info!(path = %paths.config_file().display(), "Wrote default config file");
    }

    let pid = std::process::id();
    std::fs::write(&pid_file, pid.to_string())?;
    info!(pid = pid, "Relay started");

    let cache = Arc::new(FileCacheStorage::open(paths.cache_file(), config.cache_ttl_secs)?);
    info!(path = %paths.cache_file().display(), "Durable cache opened");

    let ipc_server = IpcServer::new(&socket_path.to_string_lossy());
    let state = RelayState::new(config, paths.clone(), cache).await?;

    register_handlers(&ipc_server, state).await;

    let shutdown_tx = ipc_server.shutdown_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            let _ = shutdown_tx.send(());
        }
    });

    info!(socket = %socket_path.display(), "IPC server starting");

    let server_result = ipc_server.run().await;

    // Cleanup
    let _ = std::fs::remove_file(paths.pid_file());
    let _ = std::fs::remove_file(paths.socket_file());

    info!("Relay stopped");

    server_result.map_err(|e| e.into())
}
