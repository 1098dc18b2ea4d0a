//! Convenience calls built on [`Relay::send_request`].

use crate::{Relay, RelayResponse, RelayResult};
use relay_protocol_types::{HttpMethod, QueryValue, RequestBody, RequestDescriptor};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Optional query parameters.
pub type Query = Option<BTreeMap<String, QueryValue>>;

impl Relay {
    /// GET `endpoint` and decode the body as JSON. Non-2xx is an error.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Query,
    ) -> RelayResult<T> {
        let response = self
            .send_request(
                RequestDescriptor::new(endpoint)
                    .with_method(HttpMethod::Get)
                    .with_query(query)
                    .with_ok_only(true),
            )
            .await?;
        Ok(response.json()?)
    }

    /// POST `body` to `endpoint` and decode the body as JSON. Non-2xx is an error.
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: impl Into<RequestBody>,
    ) -> RelayResult<T> {
        let response = self
            .send_request(
                RequestDescriptor::new(endpoint)
                    .with_method(HttpMethod::Post)
                    .with_body(body)
                    .with_ok_only(true),
            )
            .await?;
        Ok(response.json()?)
    }

    /// POST through the OAuth host.
    pub async fn api_oauth_post(
        &self,
        endpoint: &str,
        body: Option<RequestBody>,
    ) -> RelayResult<RelayResponse> {
        let mut descriptor = RequestDescriptor::new(endpoint)
            .with_method(HttpMethod::Post)
            .with_oauth(true)
            .with_ok_only(true);
        descriptor.body = body;
        self.send_request(descriptor).await
    }

    /// GET through the OAuth host.
    pub async fn api_oauth_get(&self, endpoint: &str, query: Query) -> RelayResult<RelayResponse> {
        self.send_request(
            RequestDescriptor::new(endpoint)
                .with_method(HttpMethod::Get)
                .with_query(query)
                .with_oauth(true)
                .with_ok_only(true),
        )
        .await
    }

    /// DELETE through the OAuth host.
    pub async fn api_oauth_delete(
        &self,
        endpoint: &str,
        query: Query,
    ) -> RelayResult<RelayResponse> {
        self.send_request(
            RequestDescriptor::new(endpoint)
                .with_method(HttpMethod::Delete)
                .with_query(query)
                .with_oauth(true)
                .with_ok_only(true),
        )
        .await
    }
}
