//! Descriptor to URL/body translation.

use crate::{ExecutorError, ExecutorResult};
use relay_protocol_types::{QueryValue, RequestDescriptor};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

/// Resolve the endpoint against the right base and append the query.
pub(crate) fn build_url(
    descriptor: &RequestDescriptor,
    api_base: &Url,
    oauth_base: &Url,
) -> ExecutorResult<Url> {
    let endpoint = descriptor.endpoint.trim();

    let mut url = if endpoint.starts_with('/') && !endpoint.starts_with("//") {
        let base = if descriptor.oauth { oauth_base } else { api_base };
        base.join(endpoint)?
    } else if is_absolute_http(endpoint) {
        if descriptor.oauth {
            return Err(ExecutorError::AbsoluteOAuthUrl(endpoint.to_string()));
        }
        Url::parse(endpoint)?
    } else {
        return Err(ExecutorError::InvalidEndpoint(endpoint.to_string()));
    };

    if let Some(query) = &descriptor.query {
        append_query(&mut url, query);
    }

    Ok(url)
}

fn is_absolute_http(endpoint: &str) -> bool {
    let lower = endpoint.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn append_query(url: &mut Url, query: &BTreeMap<String, QueryValue>) {
    if query.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (name, value) in query {
        pairs.append_pair(name, &value.to_string());
    }
}

/// Flatten a body mapping into form pairs. Nulls are dropped and nested
/// values become their JSON text.
pub(crate) fn form_pairs(fields: &Map<String, Value>) -> Vec<(String, String)> {
    fields
        .iter()
        .filter_map(|(name, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((name.clone(), text))
        })
        .collect()
}
