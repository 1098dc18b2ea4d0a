//! The background HTTP executor.

use crate::encode::{build_url, form_pairs};
use crate::{ExecutorError, ExecutorResult};
use relay_config_and_utils::Config;
use relay_protocol_types::{HttpMethod, Reply, RequestBody, RequestDescriptor, SerializedResponse};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use tracing::{debug, info, warn};
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Everything the executor needs besides the HTTP client.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub api_base_url: Url,
    pub oauth_base_url: Url,
    pub user_agent: String,
    pub oauth_token: Option<String>,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config, oauth_token: Option<String>) -> ExecutorResult<Self> {
        Ok(Self {
            api_base_url: config.api_base_url()?,
            oauth_base_url: config.oauth_base_url()?,
            user_agent: config.user_agent.clone(),
            oauth_token,
        })
    }
}

/// Performs relayed HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http_client: reqwest::Client,
    settings: ExecutorSettings,
}

impl RequestExecutor {
    /// Create an executor with its own HTTP client.
    pub fn new(settings: ExecutorSettings) -> ExecutorResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self::with_client(settings, http_client))
    }

    /// Create an executor around an existing client.
    pub fn with_client(settings: ExecutorSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Perform `descriptor` and pack the outcome into a reply.
    ///
    /// Never fails: every error becomes a failure reply, with the response
    /// attached only when one was received.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Reply {
        let method = descriptor.effective_method();

        let response = match self.send(descriptor).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    method = %method,
                    endpoint = %descriptor.endpoint,
                    oauth = descriptor.oauth,
                    error = %e,
                    "Request failed"
                );
                return Reply::failure(e.to_string());
            }
        };

        let status = response.status();
        info!(
            method = %method,
            endpoint = %descriptor.endpoint,
            oauth = descriptor.oauth,
            status = status,
            "Request completed"
        );

        if descriptor.ok_only && !(200..300).contains(&status) {
            let message = format!("{} {}", status, response.1.status_text)
                .trim_end()
                .to_string();
            debug!(
                status = status,
                body_summary = %summarize_response_body(response.body()),
                "Rejecting non-2xx response"
            );
            return Reply::failure_with_response(message, response);
        }

        Reply::ok(response)
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> ExecutorResult<SerializedResponse> {
        let url = build_url(
            descriptor,
            &self.settings.api_base_url,
            &self.settings.oauth_base_url,
        )?;

        let mut request = self
            .http_client
            .request(to_reqwest_method(descriptor.effective_method()), url);

        if descriptor.oauth {
            let token = self
                .settings
                .oauth_token
                .as_deref()
                .ok_or(ExecutorError::MissingToken)?;
            request = request.header(reqwest::header::AUTHORIZATION, format!("bearer {}", token));
        }

        request = match &descriptor.body {
            Some(RequestBody::Text(text)) => request.body(text.clone()),
            Some(RequestBody::Fields(fields)) => request.form(&form_pairs(fields)),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let body = response.text().await?;

        let mut serialized = SerializedResponse::new(status.as_u16(), body)
            .with_status_text(status.canonical_reason().unwrap_or_default());
        serialized.1.headers = headers;
        Ok(serialized)
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP/1.1 response and hand back the raw request.
    async fn serve_once(
        status_line: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut response = format!("HTTP/1.1 {}\r\n", status_line);
        for (name, value) in headers {
            response.push_str(&format!("{}: {}\r\n", name, value));
        }
        response.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&raw) {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8_lossy(&raw).to_string()
        });

        (Url::parse(&format!("http://{}", addr)).unwrap(), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn executor(base: &Url, token: Option<&str>) -> RequestExecutor {
        let settings = ExecutorSettings {
            api_base_url: base.clone(),
            oauth_base_url: base.clone(),
            user_agent: "tbrelay-test/1.0".to_string(),
            oauth_token: token.map(str::to_string),
        };
        let client = reqwest::Client::builder()
            .no_proxy()
            .user_agent(settings.user_agent.clone())
            .build()
            .unwrap();
        RequestExecutor::with_client(settings, client)
    }

    #[tokio::test]
    async fn test_get_success_packs_response() {
        let (base, server) = serve_once(
            "200 OK",
            &[("Content-Type", "application/json"), ("X-Ratelimit-Remaining", "99")],
            r#"{"kind":"t2","data":{"name":"spez"}}"#,
        )
        .await;

        let reply = executor(&base, None)
            .execute(&RequestDescriptor::new("/api/me.json").with_query_param("raw_json", 1_u64))
            .await;

        assert!(reply.is_success());
        let response = reply.response.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.1.status_text, "OK");
        assert_eq!(response.1.headers["content-type"], "application/json");
        assert_eq!(response.1.headers["x-ratelimit-remaining"], "99");
        assert_eq!(response.body(), r#"{"kind":"t2","data":{"name":"spez"}}"#);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /api/me.json?raw_json=1 HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("user-agent: tbrelay-test/1.0"));
    }

    #[tokio::test]
    async fn test_non_2xx_without_ok_only_is_success() {
        let (base, server) = serve_once("404 Not Found", &[], "missing").await;

        let reply = executor(&base, None)
            .execute(&RequestDescriptor::new("/r/nope/about.json"))
            .await;

        assert!(reply.is_success());
        assert_eq!(reply.response.unwrap().status(), 404);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_ok_only_failure_attaches_response() {
        let (base, server) = serve_once("504 Gateway Timeout", &[], "upstream timed out").await;

        let reply = executor(&base, None)
            .execute(&RequestDescriptor::new("/api/me.json").with_ok_only(true))
            .await;

        assert!(reply.error);
        assert_eq!(reply.message.as_deref(), Some("504 Gateway Timeout"));
        let response = reply.response.unwrap();
        assert_eq!(response.status(), 504);
        assert_eq!(response.body(), "upstream timed out");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_oauth_sends_bearer_token() {
        let (base, server) = serve_once("200 OK", &[], "{}").await;

        let reply = executor(&base, Some("s3cret"))
            .execute(
                &RequestDescriptor::new("/api/v1/me")
                    .with_oauth(true)
                    .with_ok_only(true),
            )
            .await;

        assert!(reply.is_success());
        let raw = server.await.unwrap();
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer s3cret"));
    }

    #[tokio::test]
    async fn test_oauth_without_token_fails_without_response() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();

        let reply = executor(&base, None)
            .execute(&RequestDescriptor::new("/api/v1/me").with_oauth(true))
            .await;

        assert!(reply.error);
        assert!(reply.response.is_none());
        assert_eq!(reply.message.as_deref(), Some("No OAuth token configured"));
    }

    #[tokio::test]
    async fn test_form_body_is_urlencoded() {
        let (base, server) = serve_once("200 OK", &[], "{}").await;

        let fields = json!({"id": "t3_abc", "spam": false, "skip": null});
        let descriptor = RequestDescriptor::new("/api/remove")
            .with_method(HttpMethod::Post)
            .with_body(fields.as_object().unwrap().clone());
        let reply = executor(&base, None).execute(&descriptor).await;

        assert!(reply.is_success());
        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/remove HTTP/1.1"));
        assert!(raw
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(raw.ends_with("id=t3_abc&spam=false"));
    }

    #[tokio::test]
    async fn test_text_body_sent_verbatim() {
        let (base, server) = serve_once("200 OK", &[], "{}").await;

        let descriptor = RequestDescriptor::new("/api/wiki/edit")
            .with_method(HttpMethod::Put)
            .with_body("raw=text&stays=as-is");
        executor(&base, None).execute(&descriptor).await;

        let raw = server.await.unwrap();
        assert!(raw.starts_with("PUT /api/wiki/edit HTTP/1.1"));
        assert!(raw.ends_with("raw=text&stays=as-is"));
    }

    #[tokio::test]
    async fn test_network_failure_has_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let reply = executor(&base, None)
            .execute(&RequestDescriptor::new("/api/me.json"))
            .await;

        assert!(reply.error);
        assert!(reply.response.is_none());
        assert!(reply.message.unwrap().starts_with("HTTP error"));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_has_no_response() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();

        let reply = executor(&base, None)
            .execute(&RequestDescriptor::new("no-leading-slash"))
            .await;

        assert!(reply.error);
        assert!(reply.response.is_none());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::default();
        let settings = ExecutorSettings::from_config(&config, Some("tok".to_string())).unwrap();

        assert_eq!(settings.api_base_url.as_str(), "https://old.reddit.com/");
        assert_eq!(settings.oauth_base_url.as_str(), "https://oauth.reddit.com/");
        assert_eq!(settings.oauth_token.as_deref(), Some("tok"));
    }
}
