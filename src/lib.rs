pub mod record;
pub mod extract;
pub mod config;
pub mod env;
pub mod error;
pub mod client;
pub mod bootstrap;
pub mod batch;
pub mod writer;
pub mod failure;
pub mod metrics;
pub mod sink;

#[cfg(feature = "opensearch")]
pub mod opensearch;

pub mod init;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::IndexClient;
pub use config::{SinkConfig, WriteMode};
pub use error::{BootstrapError, Result, SinkError};
pub use record::Record;
pub use sink::{BulkIndexSink, SinkBuilder};
