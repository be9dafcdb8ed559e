use std::sync::Arc;

use tracing::{debug, warn};

use crate::batch::Batch;
use crate::client::IndexClient;

/// Per-operation result inside a transmitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Failure(String),
}

/// Result of sending one [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    /// The store answered; entry `i` belongs to operation `i` of the batch.
    Transmitted(Vec<ItemOutcome>),
    /// The request as a whole failed; every operation shares this cause.
    TransportFailure(String),
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            BulkOutcome::Transmitted(items) => items.iter().all(|i| *i == ItemOutcome::Success),
            BulkOutcome::TransportFailure(_) => false,
        }
    }
}

/// Sends batches over an [`IndexClient`], one request per batch.
///
/// No retries happen here; a failed request is reported once.
#[derive(Clone)]
pub struct BulkWriter {
    client: Arc<dyn IndexClient>,
}

impl BulkWriter {
    pub fn new(client: Arc<dyn IndexClient>) -> Self {
        BulkWriter { client }
    }

    /// Submit `batch` and map the store's answer back onto its operations.
    ///
    /// Items are matched by position, not by echoed `_id`: operations without
    /// an id have nothing to match on. A response with a different number of
    /// items than the batch is treated as a failed request.
    pub async fn send(&self, batch: &Batch) -> BulkOutcome {
        let expected = batch.len();
        let response = match self.client.bulk(batch.to_bulk_body()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(operations = expected, error = %e, "bulk request failed");
                return BulkOutcome::TransportFailure(e.to_string());
            }
        };

        if response.items.len() != expected {
            let cause = format!(
                "bulk response has {} items for {} operations",
                response.items.len(),
                expected
            );
            warn!(operations = expected, "{}", cause);
            return BulkOutcome::TransportFailure(cause);
        }

        let items: Vec<ItemOutcome> = response
            .items
            .iter()
            .map(|item| match item.failure_cause() {
                Some(cause) => ItemOutcome::Failure(cause),
                None => ItemOutcome::Success,
            })
            .collect();

        debug!(
            operations = expected,
            bytes = batch.estimated_bytes(),
            failed = items.iter().filter(|i| **i != ItemOutcome::Success).count(),
            "bulk request sent"
        );
        BulkOutcome::Transmitted(items)
    }
}
