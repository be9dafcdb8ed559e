use std::sync::Arc;

use serde_json::Value;

use crate::error::SinkError;
use crate::extract::IdExtractor;
use crate::record::{Record, WriteOperation};

/// Fixed per-action cost added to the payload size when estimating a bulk
/// request, covering the action line and framing.
pub const OPERATION_OVERHEAD_BYTES: u64 = 50;

/// Ordered write operations destined for a single bulk request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    operations: Vec<WriteOperation>,
    estimated_bytes: u64,
}

impl Batch {
    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<WriteOperation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn estimated_bytes(&self) -> u64 {
        self.estimated_bytes
    }

    fn push(&mut self, operation: WriteOperation) {
        self.estimated_bytes += estimate_size(&operation);
        self.operations.push(operation);
    }

    /// NDJSON bulk body: one action line and one document line per operation.
    pub fn to_bulk_body(&self) -> String {
        let mut body = String::with_capacity(self.estimated_bytes as usize);
        for op in &self.operations {
            body.push_str(&op.action_line());
            body.push('\n');
            let raw = op.raw.trim_end_matches(['\r', '\n']);
            if raw.contains('\n') {
                // pretty-printed input would break the line framing
                body.push_str(&op.source.to_string());
            } else {
                body.push_str(raw);
            }
            body.push('\n');
        }
        body
    }
}

/// Estimated contribution of one operation to a bulk request.
pub fn estimate_size(operation: &WriteOperation) -> u64 {
    operation.raw.len() as u64 + OPERATION_OVERHEAD_BYTES
}

/// Turns records into write operations and tracks when the pending batch
/// is big enough to send.
///
/// One accumulator lives for the duration of a single `write` call.
pub struct BatchAccumulator {
    index: String,
    threshold_bytes: i64,
    extractor: Arc<dyn IdExtractor>,
    current: Batch,
    seen: usize,
}

impl BatchAccumulator {
    /// `threshold_bytes <= 0` disables size-based flushing.
    pub fn new(index: impl Into<String>, threshold_bytes: i64, extractor: Arc<dyn IdExtractor>) -> Self {
        BatchAccumulator {
            index: index.into(),
            threshold_bytes,
            extractor,
            current: Batch::default(),
            seen: 0,
        }
    }

    /// Parse `record` and append it to the pending batch.
    ///
    /// A record that is not a JSON object is an error; nothing is appended.
    pub fn accumulate(&mut self, record: Record) -> Result<(), SinkError> {
        let position = self.seen;
        self.seen += 1;

        let source = parse_document(&record.data)
            .map_err(|source| SinkError::MalformedRecord { position, source })?;
        let id = self.extractor.extract_id(&source);

        self.current.push(WriteOperation {
            index: self.index.clone(),
            id,
            source,
            raw: record.data,
        });
        Ok(())
    }

    /// True once the pending batch has reached the threshold.
    pub fn is_ready(&self) -> bool {
        self.threshold_bytes > 0 && self.current.estimated_bytes >= self.threshold_bytes as u64
    }

    pub fn has_pending(&self) -> bool {
        !self.current.is_empty()
    }

    /// Hand over the pending batch and start an empty one.
    pub fn drain(&mut self) -> Batch {
        std::mem::take(&mut self.current)
    }
}

fn parse_document(data: &str) -> Result<Value, serde_json::Error> {
    let map: serde_json::Map<String, Value> = serde_json::from_str(data)?;
    Ok(Value::Object(map))
}
