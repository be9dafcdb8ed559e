use serde_json::Value;

/// Field the sink reads document ids from unless told otherwise.
pub const DEFAULT_ID_FIELD: &str = "spanId";

/// Pulls an optional document id out of a parsed record.
///
/// Returning `None` lets the store assign an id.
pub trait IdExtractor: Send + Sync {
    fn extract_id(&self, document: &Value) -> Option<String>;
}

/// Reads the id from a top-level string field.
///
/// Non-string values are ignored rather than coerced.
#[derive(Debug, Clone)]
pub struct FieldIdExtractor {
    field: String,
}

impl FieldIdExtractor {
    pub fn new(field: impl Into<String>) -> Self {
        FieldIdExtractor { field: field.into() }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for FieldIdExtractor {
    fn default() -> Self {
        FieldIdExtractor::new(DEFAULT_ID_FIELD)
    }
}

impl IdExtractor for FieldIdExtractor {
    fn extract_id(&self, document: &Value) -> Option<String> {
        document
            .get(&self.field)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Never assigns ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdExtractor;

impl IdExtractor for NoIdExtractor {
    fn extract_id(&self, _document: &Value) -> Option<String> {
        None
    }
}
