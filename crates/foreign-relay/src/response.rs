//! Responses rebuilt from the reply tuple.

use relay_protocol_types::SerializedResponse;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// An HTTP response reconstructed on the caller's side of the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    inner: SerializedResponse,
}

impl RelayResponse {
    pub fn status(&self) -> u16 {
        self.inner.status()
    }

    pub fn status_text(&self) -> &str {
        &self.inner.1.status_text
    }

    /// True for 2xx.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status())
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .1
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.inner.1.headers
    }

    pub fn text(&self) -> &str {
        self.inner.body()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.inner.body())
    }
}

impl From<SerializedResponse> for RelayResponse {
    fn from(inner: SerializedResponse) -> Self {
        Self { inner }
    }
}
