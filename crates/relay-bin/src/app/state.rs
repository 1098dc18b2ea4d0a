//! Relay state definition.

use relay_config_and_utils::{Config, Paths};
use relay_storage::CacheStorage;
use request_executor::{load_oauth_token, ExecutorResult, ExecutorSettings, RequestExecutor};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Shared relay state (thread-safe).
#[derive(Clone)]
pub struct RelayState {
    pub paths: Arc<Paths>,
    /// Current configuration, replaced on reload.
    pub config: Arc<RwLock<Config>>,
    /// Current executor, replaced on reload. In-flight requests keep the old one.
    executor: Arc<RwLock<Arc<RequestExecutor>>>,
    /// Durable cache shared with clients through `tb-cache`.
    pub cache: Arc<dyn CacheStorage>,
}

impl RelayState {
    pub async fn new(
        config: Config,
        paths: Paths,
        cache: Arc<dyn CacheStorage>,
    ) -> ExecutorResult<Self> {
        let executor = build_executor(&config, cache.clone()).await?;
        Ok(Self {
            paths: Arc::new(paths),
            config: Arc::new(RwLock::new(config)),
            executor: Arc::new(RwLock::new(Arc::new(executor))),
            cache,
        })
    }

    /// Snapshot of the current executor.
    pub async fn executor(&self) -> Arc<RequestExecutor> {
        self.executor.read().await.clone()
    }

    /// Re-read the config file and OAuth token, then swap in a new executor.
    ///
    /// On error the previous config and executor stay in place.
    pub async fn reload(&self) -> ExecutorResult<()> {
        let config = Config::load(&self.paths)?;
        let executor = build_executor(&config, self.cache.clone()).await?;

        let has_token = executor.settings().oauth_token.is_some();
        *self.executor.write().await = Arc::new(executor);
        *self.config.write().await = config;

        info!(has_oauth_token = has_token, "Configuration reloaded");
        Ok(())
    }
}

async fn build_executor(
    config: &Config,
    cache: Arc<dyn CacheStorage>,
) -> ExecutorResult<RequestExecutor> {
    let token = load_oauth_token(cache).await;
    RequestExecutor::new(ExecutorSettings::from_config(config, token)?)
}
