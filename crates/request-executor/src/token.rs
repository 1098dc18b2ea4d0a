//! OAuth token lookup.

use relay_storage::{CacheKeys, CacheStorage};
use std::sync::Arc;
use tracing::warn;

/// Environment variable that overrides the cached token.
pub const OAUTH_TOKEN_ENV: &str = "TBRELAY_OAUTH_TOKEN";

/// Resolve the bearer token: the environment first, then the durable cache.
fn resolve_oauth_token(cache: &dyn CacheStorage) -> Option<String> {
    if let Some(token) = std::env::var(OAUTH_TOKEN_ENV)
        .ok()
        .filter(|token| !token.trim().is_empty())
    {
        return Some(token.trim().to_string());
    }

    match cache.get(CacheKeys::OAUTH_NAMESPACE, CacheKeys::ACCESS_TOKEN) {
        Ok(value) => value.and_then(|value| value.as_str().map(str::to_string)),
        Err(e) => {
            warn!(error = %e, "Failed to read cached OAuth token");
            None
        }
    }
}

/// [`resolve_oauth_token`] on the blocking pool.
///
/// A cache read may rewrite the backing file when it evicts an expired token.
pub async fn load_oauth_token(cache: Arc<dyn CacheStorage>) -> Option<String> {
    match tokio::task::spawn_blocking(move || resolve_oauth_token(cache.as_ref())).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "OAuth token lookup task failed");
            None
        }
    }
}
