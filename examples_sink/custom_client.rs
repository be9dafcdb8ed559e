use std::sync::Arc;

use async_trait::async_trait;
use bulk_index_sink::client::{BulkResponse, BulkResponseItem, TransportError};
use bulk_index_sink::init::init_logging;
use bulk_index_sink::{BulkIndexSink, IndexClient, Record, SinkConfig};
use serde_json::Value;
use tracing::info;

/// Example of plugging in a completely custom transport by implementing
/// the `IndexClient` trait directly. Imagine this talks to a proprietary
/// store; here every request is printed and accepted.
struct StdoutStore;

#[async_trait]
impl IndexClient for StdoutStore {
    async fn bulk(&self, body: String) -> Result<BulkResponse, TransportError> {
        print!("[stdout-store] bulk\n{body}");
        let items = (0..body.lines().count() / 2)
            .map(|_| BulkResponseItem::created())
            .collect();
        Ok(BulkResponse { errors: false, items })
    }

    async fn index_exists(&self, _name: &str) -> Result<bool, TransportError> {
        Ok(false)
    }

    async fn create_index(&self, name: &str, write_alias: Option<&str>) -> Result<(), TransportError> {
        println!("[stdout-store] create index {name} (write alias: {write_alias:?})");
        Ok(())
    }

    async fn put_template(&self, name: &str, patterns: &[String], _template: &Value) -> Result<(), TransportError> {
        println!("[stdout-store] put template {name} for {patterns:?}");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let _ = init_logging();

    let config = SinkConfig {
        index_alias: "demo-spans".to_string(),
        ..SinkConfig::default()
    }
    .with_bulk_size_mb(1);

    let sink = BulkIndexSink::builder(config)
        .client(Arc::new(StdoutStore))
        .start()
        .await
        .expect("start sink");

    let ok = sink
        .write(vec![
            Record::new(r#"{"spanId":"a","name":"checkout"}"#),
            Record::new(r#"{"name":"no id, store assigns one"}"#),
        ])
        .await
        .expect("write");
    info!(ok, "custom client example finished");

    sink.stop().await;
}
