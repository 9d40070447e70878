//! Remote memory store over the `/api/mem0` REST endpoint.

use super::MemoryStore;
use crate::config::StoreConfig;
use crate::io::RecordNormalizer;
use crate::models::{MemoryRecord, MemoryScope};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Path of the memory endpoint, relative to the configured base URL.
const ENDPOINT_PATH: &str = "/api/mem0";

/// HTTP-backed [`MemoryStore`].
pub struct HttpMemoryStore {
    /// Full endpoint URL.
    endpoint: String,
    /// Optional bearer token.
    api_key: Option<SecretString>,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for HttpMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMemoryStore")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreAction<'a> {
    action: &'a str,
    user_id: &'a str,
    family: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

impl<'a> StoreAction<'a> {
    const fn new(action: &'a str, scope: &'a MemoryScope) -> Self {
        Self {
            action,
            user_id: scope.user_id.as_str(),
            family: scope.family.as_str(),
            text: None,
            query: None,
            limit: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    deleted: Option<usize>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpMemoryStore {
    /// Creates a store for `base_url` (without the `/api/mem0` suffix).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::operation("build_http_client", e))?;
        Ok(Self {
            endpoint: endpoint_url(base_url),
            api_key,
            client,
        })
    }

    /// Creates a store from the `[store]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no base URL is configured, or an
    /// error if the HTTP client cannot be built.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidInput(
                    "the http store backend requires store.base_url or MEMPORT_BASE_URL"
                        .to_string(),
                )
            })?;
        Self::new(
            base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Returns the endpoint URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    fn send(
        &self,
        operation: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let response = self
            .authorize(request)
            .send()
            .map_err(|e| Error::operation(operation, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::operation(
                operation,
                format!("API returned status: {status} - {body}"),
            ));
        }
        Ok(response)
    }

    fn post_action(&self, operation: &str, action: &StoreAction<'_>) -> Result<Value> {
        let response = self.send(operation, self.client.post(&self.endpoint).json(action))?;
        response.json().map_err(|e| Error::operation(operation, e))
    }
}

impl MemoryStore for HttpMemoryStore {
    #[tracing::instrument(skip(self), fields(scope = %scope))]
    fn get_memories(&self, scope: &MemoryScope, limit: usize) -> Result<Vec<MemoryRecord>> {
        let limit = limit.to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("userId", scope.user_id.as_str()),
            ("family", scope.family.as_str()),
            ("limit", limit.as_str()),
        ]);
        let body: Value = self
            .send("mem0_get_memories", request)?
            .json()
            .map_err(|e| Error::operation("mem0_get_memories", e))?;
        records_from_body("mem0_get_memories", &body)
    }

    #[tracing::instrument(skip(self, text), fields(scope = %scope))]
    fn store_memory(&self, scope: &MemoryScope, text: &str) -> Result<bool> {
        let action = StoreAction {
            text: Some(text),
            ..StoreAction::new("store", scope)
        };
        let body = self.post_action("mem0_store_memory", &action)?;
        let response = parse_action_response(&body);
        if let Some(ref error) = response.error {
            tracing::debug!(error = %error, "Store declined memory");
        }
        Ok(response.success)
    }

    #[tracing::instrument(skip(self), fields(scope = %scope))]
    fn search_memories(
        &self,
        scope: &MemoryScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let action = StoreAction {
            query: Some(query),
            limit: Some(limit),
            ..StoreAction::new("search", scope)
        };
        let body = self.post_action("mem0_search_memories", &action)?;
        records_from_body("mem0_search_memories", &body)
    }

    #[tracing::instrument(skip(self), fields(scope = %scope))]
    fn clear_memories(&self, scope: &MemoryScope) -> Result<usize> {
        let body = self.post_action("mem0_clear_memories", &StoreAction::new("clear", scope))?;
        let response = parse_action_response(&body);
        if !response.success {
            return Err(Error::operation(
                "mem0_clear_memories",
                response
                    .error
                    .unwrap_or_else(|| "store rejected clear request".to_string()),
            ));
        }
        Ok(response.deleted.unwrap_or_default())
    }
}

/// Joins the base URL and the endpoint path, tolerating a trailing slash or
/// a base URL that already ends in the endpoint path.
fn endpoint_url(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.ends_with(ENDPOINT_PATH) {
        base.to_string()
    } else {
        format!("{base}{ENDPOINT_PATH}")
    }
}

/// Extracts records from a response body: a bare array, or an object with a
/// `memories` or `results` array.
fn records_from_body(operation: &str, body: &Value) -> Result<Vec<MemoryRecord>> {
    let array = if body.is_array() {
        Some(body)
    } else {
        ["memories", "results"]
            .iter()
            .find_map(|key| body.get(key).filter(|v| v.is_array()))
    };

    array
        .and_then(RecordNormalizer::normalize_value)
        .ok_or_else(|| Error::operation(operation, "response did not contain a memory array"))
}

fn parse_action_response(body: &Value) -> ActionResponse {
    match body {
        Value::Bool(success) => ActionResponse {
            success: *success,
            ..ActionResponse::default()
        },
        other => serde_json::from_value(other.clone()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("http://localhost:3000", "http://localhost:3000/api/mem0" ; "bare host")]
    #[test_case("http://localhost:3000/", "http://localhost:3000/api/mem0" ; "trailing slash")]
    #[test_case("https://x.dev/api/mem0", "https://x.dev/api/mem0" ; "already suffixed")]
    fn test_endpoint_url(base: &str, expected: &str) {
        assert_eq!(endpoint_url(base), expected);
    }

    #[test]
    fn test_records_from_body_shapes() {
        let bare = json!([{"memory": "a"}]);
        let wrapped = json!({"memories": [{"memory": "b"}]});
        let results = json!({"results": [{"text": "c"}]});

        assert_eq!(records_from_body("t", &bare).unwrap()[0].memory, "a");
        assert_eq!(records_from_body("t", &wrapped).unwrap()[0].memory, "b");
        assert_eq!(records_from_body("t", &results).unwrap()[0].content, "c");
        assert!(records_from_body("t", &json!({"ok": true})).is_err());
    }

    #[test]
    fn test_parse_action_response() {
        assert!(parse_action_response(&json!({"success": true})).success);
        assert!(parse_action_response(&json!(true)).success);
        assert!(!parse_action_response(&json!("nope")).success);
        assert_eq!(
            parse_action_response(&json!({"success": true, "deleted": 4})).deleted,
            Some(4)
        );
    }

    #[test]
    fn test_store_action_wire_names() {
        let scope = MemoryScope::new("u1", "fam");
        let action = StoreAction {
            text: Some("hello"),
            ..StoreAction::new("store", &scope)
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({"action": "store", "userId": "u1", "family": "fam", "text": "hello"})
        );
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let config = StoreConfig::default();
        assert!(matches!(
            HttpMemoryStore::from_config(&config),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let store = HttpMemoryStore::new(
            "http://localhost:3000",
            Some(SecretString::from("sk-secret")),
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{store:?}");
        assert!(!debug.contains("sk-secret"));
        assert_eq!(store.endpoint(), "http://localhost:3000/api/mem0");
    }
}
