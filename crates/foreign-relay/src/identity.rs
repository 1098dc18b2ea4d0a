//! Signed-in user identity, fetched once and shared.
//!
//! The fetch starts as soon as a [`UserIdentity`] is created. Every caller
//! awaits the same shared future, so there is never more than one fetch
//! sequence per instance. A gateway timeout (504) is retried up to
//! [`MAX_ATTEMPTS`] total attempts. Any terminal failure falls back to the
//! last persisted copy in the durable cache.

use crate::{DurableCache, IdentityError, Relay, RelayError, Sanitizer};
use futures::future::{BoxFuture, FutureExt, Shared};
use relay_storage::CacheKeys;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Total fetch attempts, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

const RETRY_STATUS: u16 = 504;
const ME_ENDPOINT: &str = "/api/me.json";

/// The `/api/me.json` document. Unknown fields are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetails {
    pub data: UserData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modhash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

type SharedDetails = Shared<BoxFuture<'static, Option<Arc<UserDetails>>>>;

/// Process-wide answer to "who is signed in".
#[derive(Clone)]
pub struct UserIdentity {
    details: SharedDetails,
}

impl UserIdentity {
    /// Start resolving immediately on the current tokio runtime.
    pub fn spawn(
        relay: Relay,
        cache: Arc<dyn DurableCache>,
        sanitizer: Arc<dyn Sanitizer>,
    ) -> Self {
        let task = tokio::spawn(resolve(relay, cache, sanitizer));

        let details = async move {
            match task.await {
                Ok(details) => details,
                Err(e) => {
                    warn!(error = %e, "Identity task did not complete");
                    None
                }
            }
        }
        .boxed()
        .shared();

        Self { details }
    }

    /// The resolved details, absent if neither the fetch nor the cache had any.
    pub async fn user_details(&self) -> Option<Arc<UserDetails>> {
        self.details.clone().await
    }

    pub async fn modhash(&self) -> Result<String, IdentityError> {
        let details = self.user_details().await.ok_or(IdentityError::Unavailable)?;
        details
            .data
            .modhash
            .clone()
            .ok_or(IdentityError::MissingField("modhash"))
    }

    pub async fn current_user(&self) -> Result<String, IdentityError> {
        let details = self.user_details().await.ok_or(IdentityError::Unavailable)?;
        details
            .data
            .name
            .clone()
            .ok_or(IdentityError::MissingField("name"))
    }
}

async fn resolve(
    relay: Relay,
    cache: Arc<dyn DurableCache>,
    sanitizer: Arc<dyn Sanitizer>,
) -> Option<Arc<UserDetails>> {
    match fetch_user_details(&relay, cache.as_ref(), sanitizer.as_ref()).await {
        Ok(details) => Some(Arc::new(details)),
        Err(e) => {
            warn!(error = %e, status = ?e.status(), "Failed to fetch user details, using cached copy");
            read_cached(cache.as_ref()).await.map(Arc::new)
        }
    }
}

/// Fetch with retry on gateway timeouts only.
async fn fetch_user_details(
    relay: &Relay,
    cache: &dyn DurableCache,
    sanitizer: &dyn Sanitizer,
) -> Result<UserDetails, RelayError> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        match try_fetch_user_details(relay, cache, sanitizer).await {
            Ok(details) => {
                debug!(attempt = attempt, "User details fetched");
                return Ok(details);
            }
            Err(e) => {
                if e.status() != Some(RETRY_STATUS) {
                    return Err(e);
                }

                if attempt >= MAX_ATTEMPTS {
                    warn!(
                        attempt = attempt,
                        error = %e,
                        "Max attempts exceeded fetching user details"
                    );
                    return Err(e);
                }

                warn!(
                    attempt = attempt,
                    max_attempts = MAX_ATTEMPTS,
                    error = %e,
                    "User details fetch timed out, retrying"
                );
            }
        }
    }
}

/// Attempt to fetch, sanitize and persist the details (single try).
async fn try_fetch_user_details(
    relay: &Relay,
    cache: &dyn DurableCache,
    sanitizer: &dyn Sanitizer,
) -> Result<UserDetails, RelayError> {
    let mut value: Value = relay.get_json(ME_ENDPOINT, None).await?;
    sanitizer.purify(&mut value);

    let details: UserDetails = serde_json::from_value(value.clone())?;

    if let Err(e) = cache
        .set(CacheKeys::UTILS_NAMESPACE, CacheKeys::USER_DETAILS, value)
        .await
    {
        warn!(error = %e, "Failed to persist user details");
    }

    Ok(details)
}

async fn read_cached(cache: &dyn DurableCache) -> Option<UserDetails> {
    let value = match cache
        .get(CacheKeys::UTILS_NAMESPACE, CacheKeys::USER_DETAILS)
        .await
    {
        Ok(value) => value?,
        Err(e) => {
            warn!(error = %e, "Failed to read cached user details");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(details) => Some(details),
        Err(e) => {
            warn!(error = %e, "Cached user details are malformed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheError, HtmlPurifier, LocalCache};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use relay_ipc::{IpcError, IpcResult, Transport};
    use relay_protocol_types::{Message, Reply, SerializedResponse};
    use relay_storage::{CacheStorage, MemoryCacheStorage};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ME_BODY: &str = r#"{"kind":"t2","data":{"name":"spez","modhash":"abc123","is_mod":true}}"#;

    /// Plays back scripted replies in order and counts messages.
    struct ScriptedTransport {
        replies: Mutex<VecDeque<IpcResult<Reply>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<IpcResult<Reply>>) -> Arc<Self> {
            Self::with_delay(replies, Duration::ZERO)
        }

        fn with_delay(replies: Vec<IpcResult<Reply>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, message: Message) -> IpcResult<Reply> {
            assert!(matches!(message, Message::Request(_)));
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies
                .lock()
                .pop_front()
                .unwrap_or(Err(IpcError::ConnectionClosed))
        }
    }

    fn gateway_timeout() -> IpcResult<Reply> {
        Ok(Reply::failure_with_response(
            "504 Gateway Timeout",
            SerializedResponse::new(504, "").with_status_text("Gateway Timeout"),
        ))
    }

    fn me_ok(body: &str) -> IpcResult<Reply> {
        Ok(Reply::ok(SerializedResponse::new(200, body)))
    }

    fn identity(
        transport: Arc<ScriptedTransport>,
        storage: Arc<MemoryCacheStorage>,
    ) -> UserIdentity {
        UserIdentity::spawn(
            Relay::new(transport),
            Arc::new(LocalCache::new(storage)),
            Arc::new(HtmlPurifier::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let transport = ScriptedTransport::new(vec![me_ok(ME_BODY)]);
        let storage = Arc::new(MemoryCacheStorage::new());
        let identity = identity(transport.clone(), storage.clone());

        assert_eq!(identity.current_user().await.unwrap(), "spez");
        assert_eq!(identity.modhash().await.unwrap(), "abc123");
        assert_eq!(transport.calls(), 1);

        let details = identity.user_details().await.unwrap();
        assert_eq!(details.data.extra["is_mod"], true);
        assert_eq!(details.extra["kind"], "t2");

        let cached = storage
            .get(CacheKeys::UTILS_NAMESPACE, CacheKeys::USER_DETAILS)
            .unwrap()
            .unwrap();
        assert_eq!(cached["data"]["name"], "spez");
    }

    #[tokio::test]
    async fn test_success_is_sanitized_before_caching() {
        let body = json!({
            "data": {
                "name": "spez<script>alert(1)</script>",
                "modhash": "abc",
                "description": "<img src=x onerror=\"steal()\">"
            }
        })
        .to_string();
        let transport = ScriptedTransport::new(vec![me_ok(&body)]);
        let storage = Arc::new(MemoryCacheStorage::new());
        let identity = identity(transport, storage.clone());

        assert_eq!(identity.current_user().await.unwrap(), "spez");

        let cached = storage
            .get(CacheKeys::UTILS_NAMESPACE, CacheKeys::USER_DETAILS)
            .unwrap()
            .unwrap();
        assert_eq!(cached["data"]["name"], "spez");
        assert_eq!(cached["data"]["description"], "<img src=x>");
    }

    #[tokio::test]
    async fn test_retries_504_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            gateway_timeout(),
            gateway_timeout(),
            me_ok(ME_BODY),
        ]);
        let identity = identity(transport.clone(), Arc::new(MemoryCacheStorage::new()));

        assert_eq!(identity.current_user().await.unwrap(), "spez");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_three_504s_fall_back_to_cache() {
        let transport = ScriptedTransport::new(vec![
            gateway_timeout(),
            gateway_timeout(),
            gateway_timeout(),
            me_ok(ME_BODY),
        ]);
        let storage = Arc::new(MemoryCacheStorage::new());
        storage
            .set(
                CacheKeys::UTILS_NAMESPACE,
                CacheKeys::USER_DETAILS,
                json!({"data": {"name": "cached_user", "modhash": "old"}}),
            )
            .unwrap();
        let identity = identity(transport.clone(), storage);

        assert_eq!(identity.current_user().await.unwrap(), "cached_user");
        assert_eq!(identity.modhash().await.unwrap(), "old");
        assert_eq!(transport.calls(), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_three_504s_with_empty_cache_is_unavailable() {
        let transport = ScriptedTransport::new(vec![
            gateway_timeout(),
            gateway_timeout(),
            gateway_timeout(),
        ]);
        let identity = identity(transport.clone(), Arc::new(MemoryCacheStorage::new()));

        assert!(identity.user_details().await.is_none());
        assert_eq!(identity.modhash().await, Err(IdentityError::Unavailable));
        assert_eq!(identity.current_user().await, Err(IdentityError::Unavailable));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_non_504_failure_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Ok(Reply::failure_with_response(
                "403 Forbidden",
                SerializedResponse::new(403, ""),
            )),
            me_ok(ME_BODY),
        ]);
        let identity = identity(transport.clone(), Arc::new(MemoryCacheStorage::new()));

        assert!(identity.user_details().await.is_none());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_without_response_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Ok(Reply::failure("connection reset")),
            me_ok(ME_BODY),
        ]);
        let identity = identity(transport.clone(), Arc::new(MemoryCacheStorage::new()));

        assert!(identity.user_details().await.is_none());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_details_fall_back() {
        let transport = ScriptedTransport::new(vec![me_ok(r#"{"kind":"t2"}"#), me_ok(ME_BODY)]);
        let storage = Arc::new(MemoryCacheStorage::new());
        let identity = identity(transport.clone(), storage.clone());

        assert!(identity.user_details().await.is_none());
        assert_eq!(transport.calls(), 1);
        assert!(!storage
            .has(CacheKeys::UTILS_NAMESPACE, CacheKeys::USER_DETAILS)
            .unwrap());
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let transport = ScriptedTransport::new(vec![me_ok(r#"{"data":{"name":"spez"}}"#)]);
        let identity = identity(transport, Arc::new(MemoryCacheStorage::new()));

        assert_eq!(identity.current_user().await.unwrap(), "spez");
        assert_eq!(
            identity.modhash().await,
            Err(IdentityError::MissingField("modhash"))
        );
    }

    #[tokio::test]
    async fn test_concurrent_awaiters_share_one_fetch() {
        let transport =
            ScriptedTransport::with_delay(vec![me_ok(ME_BODY)], Duration::from_millis(50));
        let identity = identity(transport.clone(), Arc::new(MemoryCacheStorage::new()));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let identity = identity.clone();
            handles.push(tokio::spawn(async move { identity.current_user().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "spez");
        }

        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_starts_without_awaiting() {
        let transport = ScriptedTransport::new(vec![me_ok(ME_BODY)]);
        let storage = Arc::new(MemoryCacheStorage::new());
        let _identity = identity(transport.clone(), storage.clone());

        for _ in 0..100 {
            if storage
                .has(CacheKeys::UTILS_NAMESPACE, CacheKeys::USER_DETAILS)
                .unwrap()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(transport.calls(), 1);
    }

    /// Cache whose writes always fail.
    struct ReadOnlyCache;

    #[async_trait]
    impl DurableCache for ReadOnlyCache {
        async fn get(&self, _: &str, _: &str) -> Result<Option<Value>, CacheError> {
            Ok(None)
        }

        async fn set(&self, _: &str, _: &str, _: Value) -> Result<(), CacheError> {
            Err(CacheError::Relay(RelayError::Remote {
                message: "read only".to_string(),
                response: None,
            }))
        }

        async fn delete(&self, _: &str, _: &str) -> Result<bool, CacheError> {
            Ok(false)
        }

        async fn clear(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_fail_fetch() {
        let transport = ScriptedTransport::new(vec![me_ok(ME_BODY)]);
        let identity = UserIdentity::spawn(
            Relay::new(transport.clone()),
            Arc::new(ReadOnlyCache),
            Arc::new(HtmlPurifier::new().unwrap()),
        );

        assert_eq!(identity.current_user().await.unwrap(), "spez");
        assert_eq!(transport.calls(), 1);
    }
}
