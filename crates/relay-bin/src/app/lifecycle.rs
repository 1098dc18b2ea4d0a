//! Relay lifecycle management (stop, status).

use relay_config_and_utils::Paths;
use relay_ipc::{IpcClient, Message};

/// Stop the relay.
pub async fn stop_relay(paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    let socket_path = paths.socket_file();
    let pid_path = paths.pid_file();

    if !socket_path.exists() {
        println!("Relay is not running (socket not found)");
        if pid_path.exists() {
            let _ = std::fs::remove_file(&pid_path);
        }
        return Ok(());
    }

    let client = IpcClient::new(&socket_path.to_string_lossy());

    match client.call(Message::Shutdown).await {
        Ok(reply) => {
            if reply.is_success() {
                println!("Relay shutdown initiated");
            } else {
                println!("Shutdown failed: {}", reply.message.unwrap_or_default());
            }
        }
        Err(e) => {
            println!("Failed to connect to relay: {}", e);
        }
    }

    // Wait for the relay to stop (up to 3 seconds)
    for _ in 0..30 {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        if !socket_path.exists() {
            println!("Relay stopped");
            return Ok(());
        }
    }

    if let Some(pid) = read_pid(paths) {
        println!("Relay did not stop gracefully, sending SIGKILL to PID {}", pid);
        unsafe {
            libc::kill(pid, libc::SIGKILL);
        }
        let _ = std::fs::remove_file(&socket_path);
        let _ = std::fs::remove_file(&pid_path);
        println!("Relay killed");
        return Ok(());
    }

    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
        println!("Cleaned up stale socket file");
    }

    Ok(())
}

/// Check relay status.
pub async fn check_status(paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    let socket_path = paths.socket_file();

    if !socket_path.exists() {
        println!("Relay is not running (socket not found)");
        return Ok(());
    }

    let client = IpcClient::new(&socket_path.to_string_lossy());

    match client.call(Message::Health).await {
        Ok(reply) => {
            if !reply.is_success() {
                println!("Relay returned error: {}", reply.message.unwrap_or_default());
                return Ok(());
            }
            let Some(data) = reply.data else {
                println!("Relay is running (no details available)");
                return Ok(());
            };

            let version = data
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let status = data
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            println!("Relay is running");
            println!("  Status:  {}", status);
            println!("  Version: {}", version);
            if let Some(pid) = read_pid(paths) {
                println!("  PID:     {}", pid);
            }
            println!("  Socket:  {}", socket_path.display());
        }
        Err(e) => {
            println!("Failed to connect to relay: {}", e);
            println!("Relay may not be running or socket may be stale");
        }
    }

    Ok(())
}

fn read_pid(paths: &Paths) -> Option<i32> {
    std::fs::read_to_string(paths.pid_file())
        .ok()?
        .trim()
        .parse::<i32>()
        .ok()
}
