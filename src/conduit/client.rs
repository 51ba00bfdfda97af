// Conduit API client.
// Injects the auth envelope, consults the response cache and validates the envelope.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::cache::{ResponseCache, fingerprint};
use crate::config::Config;
use crate::error::Result;

use super::transport::Transport;
use super::types::Envelope;

/// Output format requested from the server.
const OUTPUT_FORMAT: &str = "json";

/// A single logical Conduit RPC.
pub trait Conduit {
    /// Call `method` and return the decoded `result` payload.
    fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value>;
}

/// Caching Conduit client.
pub struct ConduitClient<T, C> {
    config: Config,
    transport: T,
    cache: C,
}

impl<T: Transport, C: ResponseCache> ConduitClient<T, C> {
    pub fn new(config: Config, transport: T, cache: C) -> Self {
        Self {
            config,
            transport,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Call `method` and deserialize the result.
    pub fn call_typed<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<R> {
        let result = self.call(method, params)?;
        Ok(serde_json::from_value(result)?)
    }
}

impl<T: Transport, C: ResponseCache> Conduit for ConduitClient<T, C> {
    fn call(&self, method: &str, mut params: Map<String, Value>) -> Result<Value> {
        let url = self.config.method_url(method);
        params.insert(
            "__conduit__".to_string(),
            json!({ "token": self.config.token() }),
        );
        let params = Value::Object(params);
        let key = fingerprint(&url, &params);

        if let Some(body) = self.cache.get(&key)? {
            tracing::debug!(method, fingerprint = %key, "reusing cached response");
            let envelope: Envelope = serde_json::from_slice(&body)?;
            return envelope.into_result();
        }

        tracing::info!(method, "calling conduit");
        let payload = serde_json::to_string(&params)?;
        let body = self
            .transport
            .post_form(&url, &[("params", &payload), ("output", OUTPUT_FORMAT)])?;

        let envelope: Envelope = serde_json::from_slice(&body)?;
        let result = envelope.into_result()?;

        self.cache.put(&key, &body)?;
        tracing::debug!(method, fingerprint = %key, "cached response");

        Ok(result)
    }
}

impl<T: Conduit + ?Sized> Conduit for &T {
    fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value> {
        (**self).call(method, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DiskCache, MemoryCache};
    use crate::conduit::testing::FakeTransport;
    use crate::error::PhabStatsError;
    use reqwest::StatusCode;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TOKEN: &str = "api-abcdefghijklmnopqrstuvwxyz12";

    fn config() -> Config {
        Config::new("https://phab.example.com/api/", TOKEN, PathBuf::new()).unwrap()
    }

    fn params(after: Value) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("objectIdentifier".to_string(), json!("PHID-DREV-a"));
        params.insert("after".to_string(), after);
        params
    }

    #[test]
    fn test_miss_then_hit() {
        let transport = FakeTransport::ok(r#"{"result":{"data":[]},"error_code":null,"error_info":null}"#);
        let client = ConduitClient::new(config(), &transport, MemoryCache::new());

        let first = client.call("transaction.search", params(Value::Null)).unwrap();
        let second = client.call("transaction.search", params(Value::Null)).unwrap();

        assert_eq!(first, json!({"data": []}));
        assert_eq!(first, second);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(client.cache().len(), 1);
    }

    #[test]
    fn test_form_body_carries_token_and_output() {
        let transport = FakeTransport::ok(r#"{"result":[],"error_code":null,"error_info":null}"#);
        let client = ConduitClient::new(config(), &transport, MemoryCache::new());

        client.call("feed.query", params(json!("7"))).unwrap();

        let requests = transport.requests();
        let (url, form) = &requests[0];
        assert_eq!(url, "https://phab.example.com/api/feed.query");
        assert!(form.contains(&("output".to_string(), "json".to_string())));

        let sent = form
            .iter()
            .find(|(name, _)| name == "params")
            .map(|(_, value)| serde_json::from_str::<Value>(value).unwrap())
            .unwrap();
        assert_eq!(sent["__conduit__"]["token"], json!(TOKEN));
        assert_eq!(sent["after"], json!("7"));
    }

    #[test]
    fn test_different_params_miss() {
        let transport = FakeTransport::ok(r#"{"result":{},"error_code":null,"error_info":null}"#);
        let client = ConduitClient::new(config(), &transport, MemoryCache::new());

        client.call("transaction.search", params(Value::Null)).unwrap();
        client.call("transaction.search", params(json!("1"))).unwrap();

        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_remote_error_not_cached() {
        let transport = FakeTransport::ok(
            r#"{"result":null,"error_code":"ERR-CONDUIT-CORE","error_info":"boom"}"#,
        );
        let client = ConduitClient::new(config(), &transport, MemoryCache::new());

        let err = client.call("feed.query", params(Value::Null)).unwrap_err();

        assert!(matches!(err, PhabStatsError::Remote { .. }));
        assert_eq!(client.cache().len(), 0);
    }

    #[test]
    fn test_body_without_error_code_is_rejected_and_not_cached() {
        let transport = FakeTransport::ok(r#"{"foo":1}"#);
        let client = ConduitClient::new(config(), &transport, MemoryCache::new());

        let err = client.call("feed.query", params(Value::Null)).unwrap_err();

        assert!(matches!(err, PhabStatsError::Json(_)));
        assert_eq!(client.cache().len(), 0);
    }

    #[test]
    fn test_status_error_propagates() {
        let transport = FakeTransport::status(StatusCode::BAD_GATEWAY);
        let client = ConduitClient::new(config(), &transport, MemoryCache::new());

        let err = client.call("feed.query", params(Value::Null)).unwrap_err();

        assert!(matches!(err, PhabStatsError::Status { .. }));
        assert_eq!(client.cache().len(), 0);
    }

    #[test]
    fn test_disk_cache_survives_new_client() {
        let temp_dir = TempDir::new().unwrap();
        let body = r#"{"result":{"data":[1]},"error_code":null,"error_info":null}"#;

        let transport = FakeTransport::ok(body);
        let client = ConduitClient::new(config(), &transport, DiskCache::new(temp_dir.path()));
        client.call("transaction.search", params(Value::Null)).unwrap();

        let offline = FakeTransport::status(StatusCode::SERVICE_UNAVAILABLE);
        let client = ConduitClient::new(config(), &offline, DiskCache::new(temp_dir.path()));
        let result = client.call("transaction.search", params(Value::Null)).unwrap();

        assert_eq!(result, json!({"data": [1]}));
        assert!(offline.requests().is_empty());
    }

    #[test]
    fn test_call_typed() {
        let transport = FakeTransport::ok(
            r#"{"result":{"data":[],"cursor":{"after":null}},"error_code":null,"error_info":null}"#,
        );
        let client = ConduitClient::new(config(), &transport, MemoryCache::new());

        let page: crate::conduit::TransactionPage = client
            .call_typed("transaction.search", params(Value::Null))
            .unwrap();

        assert!(page.data.is_empty());
        assert!(page.cursor.after.is_none());
    }
}
