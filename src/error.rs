use crate::client::TransportError;

pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors that abort a [`crate::sink::BulkIndexSink`] call.
///
/// Per-document rejections and failed bulk round-trips are *not* reported
/// here; they are folded into the boolean returned by `write` and routed to
/// the dead-letter queue instead.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("invalid sink configuration: {0}")]
    Config(String),

    #[error("destination bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("record {position} is not a JSON object: {source}")]
    MalformedRecord {
        position: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("dead-letter file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised while preparing the destination index before the first write.
#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    #[error("failed to fetch index template from {locator}: {reason}")]
    TemplateFetch { locator: String, reason: String },

    #[error("index template from {locator} is not a JSON object: {reason}")]
    TemplateParse { locator: String, reason: String },

    #[error("store rejected bootstrap request: {0}")]
    Transport(#[from] TransportError),
}
