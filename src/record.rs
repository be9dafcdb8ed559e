use serde::Serialize;
use serde_json::Value;

/// A single JSON document handed to the sink by the pipeline.
///
/// The payload is kept as the raw string the pipeline produced so it can be
/// shipped to the store byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: String,
}

impl Record {
    pub fn new(data: impl Into<String>) -> Self {
        Record { data: data.into() }
    }
}

impl From<String> for Record {
    fn from(data: String) -> Self {
        Record { data }
    }
}

impl From<&str> for Record {
    fn from(data: &str) -> Self {
        Record::new(data)
    }
}

/// One `index` action in a bulk request, derived 1:1 from a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOperation {
    /// Target index or write alias.
    pub index: String,
    /// Document id, when the extractor found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Parsed document body.
    pub source: Value,
    /// Raw payload as received; this is what goes over the wire.
    #[serde(skip)]
    pub raw: String,
}

impl WriteOperation {
    /// Bulk action metadata line, without the trailing newline.
    pub fn action_line(&self) -> String {
        let mut meta = serde_json::Map::new();
        meta.insert("_index".to_string(), Value::String(self.index.clone()));
        if let Some(id) = &self.id {
            meta.insert("_id".to_string(), Value::String(id.clone()));
        }
        let mut action = serde_json::Map::new();
        action.insert("index".to_string(), Value::Object(meta));
        Value::Object(action).to_string()
    }
}

/// A write operation the store did not accept, together with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub operation: WriteOperation,
    pub cause: String,
}

#[derive(Serialize)]
struct FailureLine<'a> {
    #[serde(rename = "Document")]
    document: &'a WriteOperation,
    failure: &'a str,
}

impl FailureRecord {
    pub fn new(operation: WriteOperation, cause: impl Into<String>) -> Self {
        FailureRecord {
            operation,
            cause: cause.into(),
        }
    }

    /// Single dead-letter line: `{"Document": {...}, "failure": "..."}`.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let line = FailureLine {
            document: &self.operation,
            failure: &self.cause,
        };
        serde_json::to_string(&line)
    }
}
