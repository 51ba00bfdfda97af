// Request fingerprinting.
// Derives the cache key from the endpoint URL and canonical JSON parameters.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest identifying one logical Conduit request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a request.
///
/// Object keys are sorted at every depth before hashing, so parameter
/// insertion order never affects the result.
pub fn fingerprint(url: &str, params: &Value) -> RequestFingerprint {
    let payload = format!("{}{}", url, canonicalize(params));
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    RequestFingerprint(hex::encode(hasher.finalize()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key.clone(), canonicalize(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
