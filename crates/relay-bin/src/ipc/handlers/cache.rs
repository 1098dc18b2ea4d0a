//! `tb-cache` handler.

use crate::app::RelayState;
use relay_ipc::{Action, IpcServer, Message, Reply};
use relay_protocol_types::{CacheCommand, CacheOp};
use relay_storage::{CacheStorage, StorageResult};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Register the durable cache handler.
pub async fn register(server: &IpcServer, state: RelayState) {
    server
        .register_handler(Action::Cache, move |message| {
            let state = state.clone();
            async move {
                let Message::Cache(command) = message else {
                    return Reply::failure("Expected a cache message");
                };
                let cache = state.cache.clone();
                let task = tokio::task::spawn_blocking(move || handle(cache.as_ref(), command));
                match task.await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(error = %e, "Cache task failed");
                        Reply::failure(format!("Cache task failed: {}", e))
                    }
                }
            }
        })
        .await;

    info!("Registered cache handler");
}

fn handle(cache: &dyn CacheStorage, command: CacheCommand) -> Reply {
    let needs_key = !matches!(command.op, CacheOp::Clear);
    if needs_key && (command.namespace.is_empty() || command.key.is_empty()) {
        return Reply::failure("namespace and key are required");
    }

    debug!(op = ?command.op, namespace = %command.namespace, key = %command.key, "Cache command");

    match apply(cache, command) {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Cache command failed");
            Reply::failure(e.to_string())
        }
    }
}

fn apply(cache: &dyn CacheStorage, command: CacheCommand) -> StorageResult<Reply> {
    let CacheCommand {
        op,
        namespace,
        key,
        value,
    } = command;

    let data = match op {
        CacheOp::Get => cache.get(&namespace, &key)?.unwrap_or(Value::Null),
        CacheOp::Set => {
            let Some(value) = value else {
                return Ok(Reply::failure("value is required"));
            };
            cache.set(&namespace, &key, value)?;
            json!({ "stored": true })
        }
        CacheOp::Delete => json!({ "deleted": cache.delete(&namespace, &key)? }),
        CacheOp::Clear => {
            cache.clear()?;
            json!({ "cleared": true })
        }
    };

    Ok(Reply::with_data(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_config_and_utils::{Config, Paths};
    use relay_ipc::{LocalTransport, Transport};
    use relay_storage::{FileCacheStorage, MemoryCacheStorage};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_get_set_delete_clear() {
        let cache = MemoryCacheStorage::new();

        let reply = handle(&cache, CacheCommand::get("Utils", "userDetails"));
        assert_eq!(reply.data, Some(Value::Null));

        let reply = handle(
            &cache,
            CacheCommand::set("Utils", "userDetails", json!({"data": {"name": "spez"}})),
        );
        assert_eq!(reply.data.unwrap()["stored"], true);

        let reply = handle(&cache, CacheCommand::get("Utils", "userDetails"));
        assert_eq!(reply.data.unwrap()["data"]["name"], "spez");

        let reply = handle(&cache, CacheCommand::delete("Utils", "userDetails"));
        assert_eq!(reply.data.unwrap()["deleted"], true);

        cache.set("oauth", "accessToken", json!("t")).unwrap();
        let reply = handle(&cache, CacheCommand::clear());
        assert_eq!(reply.data.unwrap()["cleared"], true);
        assert!(!cache.has("oauth", "accessToken").unwrap());
    }

    #[test]
    fn test_missing_key_rejected() {
        let cache = MemoryCacheStorage::new();
        let reply = handle(&cache, CacheCommand::get("Utils", ""));
        assert!(reply.error);
        assert_eq!(reply.message.as_deref(), Some("namespace and key are required"));
    }

    #[test]
    fn test_set_without_value_rejected() {
        let cache = MemoryCacheStorage::new();
        let mut command = CacheCommand::set("Utils", "k", json!(1));
        command.value = None;

        let reply = handle(&cache, command);
        assert!(reply.error);
        assert!(!cache.has("Utils", "k").unwrap());
    }

    #[test]
    fn test_storage_failure_becomes_failure_reply() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        // A directory where the temp file should go makes every write fail
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();
        let cache = FileCacheStorage::open(&path, 0).unwrap();

        let reply = handle(&cache, CacheCommand::set("Utils", "k", json!(1)));
        assert!(reply.error);
        assert!(reply.message.unwrap().starts_with("IO error"));
    }

    #[tokio::test]
    async fn test_registered_handler_uses_file_cache() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let cache = Arc::new(FileCacheStorage::open(paths.cache_file(), 0).unwrap());
        let state = RelayState::new(Config::default(), paths.clone(), cache)
            .await
            .unwrap();
        let server = IpcServer::new("/tmp/tbrelay-cache-test.sock");
        register(&server, state).await;
        let transport = LocalTransport::new(server.dispatcher().clone());

        let reply = transport
            .send(Message::Cache(CacheCommand::set("Utils", "k", json!("v"))))
            .await
            .unwrap();
        assert!(reply.is_success());

        // Rewrites now fail; the failed set must not become visible
        std::fs::create_dir(paths.cache_file().with_extension("json.tmp")).unwrap();
        let reply = transport
            .send(Message::Cache(CacheCommand::set("Utils", "k", json!("lost"))))
            .await
            .unwrap();
        assert!(reply.error);

        let reply = transport
            .send(Message::Cache(CacheCommand::get("Utils", "k")))
            .await
            .unwrap();
        assert_eq!(reply.data, Some(json!("v")));
    }
}
