use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Already-authenticated connection to the document store.
///
/// The sink never builds requests itself beyond the NDJSON bulk body; every
/// round-trip goes through this trait so the HTTP binding can be swapped for
/// another transport (or a scripted one in tests).
///
/// Implementations must be safe to share between concurrent `write` calls.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Submit one NDJSON bulk body and return the decoded per-item response.
    ///
    /// **Returns**
    /// - `Ok(..)` when the store answered with a parseable bulk response,
    ///   even if some items inside it failed.
    /// - `Err(..)` when the request as a whole failed (connection error,
    ///   non-success status, undecodable body).
    async fn bulk(&self, body: String) -> Result<BulkResponse, TransportError>;

    /// Whether `name` resolves to anything in the store, either a concrete
    /// index or an alias.
    async fn index_exists(&self, name: &str) -> Result<bool, TransportError>;

    /// Create index `name`, optionally binding `write_alias` to it as the
    /// active write index.
    async fn create_index(&self, name: &str, write_alias: Option<&str>) -> Result<(), TransportError>;

    /// Store an index template named `name` covering `patterns`.
    async fn put_template(
        &self,
        name: &str,
        patterns: &[String],
        template: &Value,
    ) -> Result<(), TransportError>;

    /// Release connections held by the client.
    ///
    /// Default implementation is a no-op.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Failure of a whole request to the store.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[cfg(feature = "opensearch")]
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Decoded body of a bulk call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    /// Store-side hint that at least one item failed.
    #[serde(default)]
    pub errors: bool,
    /// One entry per submitted action, in submission order.
    #[serde(default)]
    pub items: Vec<BulkResponseItem>,
}

/// One item of a bulk response, keyed by its action (`index`, `create`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BulkResponseItem(pub BTreeMap<String, BulkItemResult>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkResponseItem {
    /// Successful item, as an `index` action with status 201.
    pub fn created() -> Self {
        Self::from_result(BulkItemResult {
            status: 201,
            ..BulkItemResult::default()
        })
    }

    /// Rejected item carrying a store error of `kind` with `reason`.
    pub fn rejected(status: u16, kind: &str, reason: &str) -> Self {
        Self::from_result(BulkItemResult {
            status,
            error: Some(serde_json::json!({ "type": kind, "reason": reason })),
            ..BulkItemResult::default()
        })
    }

    fn from_result(result: BulkItemResult) -> Self {
        let mut map = BTreeMap::new();
        map.insert("index".to_string(), result);
        BulkResponseItem(map)
    }

    /// Why the store rejected this item, or `None` if it was accepted.
    pub fn failure_cause(&self) -> Option<String> {
        let Some(result) = self.0.values().next() else {
            return Some("empty bulk response item".to_string());
        };

        match &result.error {
            Some(Value::Object(err)) => {
                let kind = err.get("type").and_then(Value::as_str);
                let reason = err.get("reason").and_then(Value::as_str);
                Some(match (kind, reason) {
                    (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
                    (Some(kind), None) => kind.to_string(),
                    (None, Some(reason)) => reason.to_string(),
                    (None, None) => Value::Object(err.clone()).to_string(),
                })
            }
            Some(Value::String(reason)) => Some(reason.clone()),
            Some(other) => Some(other.to_string()),
            None if result.status >= 300 => Some(format!("status {}", result.status)),
            None => None,
        }
    }
}
