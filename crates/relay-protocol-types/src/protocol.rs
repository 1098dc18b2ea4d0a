//! Relay protocol definitions.
//!
//! One message is answered by exactly one reply. The transport provides the
//! pairing, so messages carry no correlation id.

use crate::RequestDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Action tags understood by the background process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "tb-request")]
    Request,
    #[serde(rename = "tb-reload")]
    Reload,
    #[serde(rename = "tb-cache")]
    Cache,
    #[serde(rename = "health")]
    Health,
    #[serde(rename = "shutdown")]
    Shutdown,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Request => "tb-request",
            Action::Reload => "tb-reload",
            Action::Cache => "tb-cache",
            Action::Health => "health",
            Action::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message posted over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    /// Perform an HTTP request in the background process.
    #[serde(rename = "tb-request")]
    Request(RequestDescriptor),
    /// Reload the background process configuration.
    #[serde(rename = "tb-reload")]
    Reload,
    /// Operate on the background durable cache.
    #[serde(rename = "tb-cache")]
    Cache(CacheCommand),
    #[serde(rename = "health")]
    Health,
    #[serde(rename = "shutdown")]
    Shutdown,
}

impl Message {
    /// The action tag used to route this message.
    pub fn action(&self) -> Action {
        match self {
            Message::Request(_) => Action::Request,
            Message::Reload => Action::Reload,
            Message::Cache(_) => Action::Cache,
            Message::Health => Action::Health,
            Message::Shutdown => Action::Shutdown,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Durable cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOp {
    Get,
    Set,
    Delete,
    Clear,
}

/// Payload of a `tb-cache` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheCommand {
    pub op: CacheOp,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl CacheCommand {
    pub fn get(namespace: &str, key: &str) -> Self {
        Self {
            op: CacheOp::Get,
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: None,
        }
    }

    pub fn set(namespace: &str, key: &str, value: serde_json::Value) -> Self {
        Self {
            op: CacheOp::Set,
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: Some(value),
        }
    }

    pub fn delete(namespace: &str, key: &str) -> Self {
        Self {
            op: CacheOp::Delete,
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: None,
        }
    }

    pub fn clear() -> Self {
        Self {
            op: CacheOp::Clear,
            namespace: String::new(),
            key: String::new(),
            value: None,
        }
    }
}

/// Second constructor argument of a serialized response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInit {
    pub status: u16,
    #[serde(
        default,
        rename = "statusText",
        skip_serializing_if = "String::is_empty"
    )]
    pub status_text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// The raw arguments needed to rebuild a response: `[body, init]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedResponse(pub String, pub ResponseInit);

impl SerializedResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self(
            body.into(),
            ResponseInit {
                status,
                status_text: String::new(),
                headers: BTreeMap::new(),
            },
        )
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.1.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.1.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(&self) -> &str {
        &self.0
    }

    pub fn status(&self) -> u16 {
        self.1.status
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Reply envelope returned for every message.
///
/// `message` is present iff `error` is set. `response` is present unless the
/// failure happened before any HTTP response existed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<SerializedResponse>,
    /// Result payload for non-request actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Reply {
    /// Successful HTTP round trip.
    pub fn ok(response: SerializedResponse) -> Self {
        Self {
            response: Some(response),
            ..Self::default()
        }
    }

    /// Successful non-request action.
    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Failure with no response attached.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Failure that still carries the HTTP response for inspection.
    pub fn failure_with_response(message: impl Into<String>, response: SerializedResponse) -> Self {
        Self {
            error: true,
            message: Some(message.into()),
            response: Some(response),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.error
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpMethod;

    #[test]
    fn test_request_message_serialization() {
        let message = Message::Request(
            RequestDescriptor::new("/api/me.json")
                .with_method(HttpMethod::Get)
                .with_ok_only(true),
        );
        let json = message.to_json().unwrap();

        assert!(json.contains("\"action\":\"tb-request\""));
        assert!(json.contains("\"method\":\"GET\""));
        assert!(json.contains("\"endpoint\":\"/api/me.json\""));
        assert!(json.contains("\"okOnly\":true"));
    }

    #[test]
    fn test_request_message_deserialization() {
        let json = r#"{"action":"tb-request","method":"POST","endpoint":"/api/remove","body":{"id":"t3_abc"},"oauth":true,"okOnly":true}"#;
        let message = Message::from_json(json).unwrap();

        assert_eq!(message.action(), Action::Request);
        match message {
            Message::Request(descriptor) => {
                assert_eq!(descriptor.method, Some(HttpMethod::Post));
                assert_eq!(descriptor.endpoint, "/api/remove");
                assert!(descriptor.oauth);
                assert!(descriptor.ok_only);
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_actions_serialize_as_tag_only() {
        assert_eq!(Message::Reload.to_json().unwrap(), r#"{"action":"tb-reload"}"#);
        assert_eq!(Message::Health.to_json().unwrap(), r#"{"action":"health"}"#);
        assert_eq!(
            Message::from_json(r#"{"action":"shutdown"}"#).unwrap(),
            Message::Shutdown
        );
    }

    #[test]
    fn test_cache_message_round_trip() {
        let message = Message::Cache(CacheCommand::set(
            "Utils",
            "userDetails",
            serde_json::json!({"data": {"name": "spez"}}),
        ));
        let json = message.to_json().unwrap();
        assert!(json.contains("\"action\":\"tb-cache\""));
        assert!(json.contains("\"op\":\"set\""));

        let parsed = Message::from_json(&json).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.action(), Action::Cache);
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(Message::from_json(r#"{"action":"tb-unknown"}"#).is_err());
        assert!(Message::from_json(r#"{"endpoint":"/api/me.json"}"#).is_err());
        assert!(Message::from_json("not json").is_err());
    }

    #[test]
    fn test_action_tags_match_message_tags() {
        let messages = vec![
            Message::Request(RequestDescriptor::new("/")),
            Message::Reload,
            Message::Cache(CacheCommand::clear()),
            Message::Health,
            Message::Shutdown,
        ];

        for message in messages {
            let json: serde_json::Value = serde_json::to_value(&message).unwrap();
            assert_eq!(json["action"], message.action().as_str());
            assert_eq!(
                serde_json::to_value(message.action()).unwrap(),
                json["action"]
            );
        }
    }

    #[test]
    fn test_success_reply_shape() {
        let reply = Reply::ok(SerializedResponse::new(200, r#"{"kind":"t2"}"#));
        let json: serde_json::Value = serde_json::to_value(&reply).unwrap();

        assert!(json.get("error").is_none());
        assert!(json.get("message").is_none());
        assert_eq!(json["response"][0], r#"{"kind":"t2"}"#);
        assert_eq!(json["response"][1]["status"], 200);
    }

    #[test]
    fn test_reply_parses_minimal_response_tuple() {
        let reply = Reply::from_json(r#"{"error":false,"response":["hello",{"status":200}]}"#).unwrap();

        assert!(reply.is_success());
        let response = reply.response.unwrap();
        assert_eq!(response.body(), "hello");
        assert_eq!(response.status(), 200);
        assert!(response.1.headers.is_empty());
    }

    #[test]
    fn test_failure_reply_with_response() {
        let response = SerializedResponse::new(504, "upstream timed out")
            .with_status_text("Gateway Timeout")
            .with_header("content-type", "text/plain");
        let reply = Reply::failure_with_response("504 Gateway Timeout", response);
        let json = reply.to_json().unwrap();

        assert!(json.contains("\"error\":true"));
        assert!(json.contains("\"statusText\":\"Gateway Timeout\""));

        let parsed = Reply::from_json(&json).unwrap();
        assert!(!parsed.is_success());
        assert_eq!(parsed.message.as_deref(), Some("504 Gateway Timeout"));
        assert_eq!(parsed.response.unwrap().status(), 504);
    }

    #[test]
    fn test_failure_reply_without_response() {
        let reply = Reply::failure("connection refused");
        let parsed = Reply::from_json(&reply.to_json().unwrap()).unwrap();

        assert!(parsed.error);
        assert!(parsed.response.is_none());
        assert!(parsed.data.is_none());
    }
}
