use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::batch::{Batch, BatchAccumulator};
use crate::bootstrap::ensure_destination;
use crate::client::IndexClient;
use crate::config::SinkConfig;
use crate::error::{Result, SinkError};
use crate::extract::{FieldIdExtractor, IdExtractor};
use crate::failure::{DeadLetterQueue, FailureSink};
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::record::{FailureRecord, Record};
use crate::writer::{BulkOutcome, BulkWriter, ItemOutcome};

/// Assembles a [`BulkIndexSink`] from a [`SinkConfig`] and optional
/// collaborators.
///
/// Anything not supplied is derived from the configuration: an
/// [`crate::opensearch::OpenSearchClient`] for `connection`, a
/// [`DeadLetterQueue`] for `dlq_file` and a [`FieldIdExtractor`] reading
/// `spanId`.
pub struct SinkBuilder {
    config: SinkConfig,
    client: Option<Arc<dyn IndexClient>>,
    extractor: Arc<dyn IdExtractor>,
    failure_sink: Option<Arc<dyn FailureSink>>,
    bootstrap_on_start: bool,
}

impl SinkBuilder {
    pub fn new(config: SinkConfig) -> Self {
        SinkBuilder {
            config,
            client: None,
            extractor: Arc::new(FieldIdExtractor::default()),
            failure_sink: None,
            bootstrap_on_start: true,
        }
    }

    pub fn client(mut self, client: Arc<dyn IndexClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn id_extractor(mut self, extractor: Arc<dyn IdExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the dead-letter queue built from `dlq_file`.
    pub fn failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// When `false`, the destination is prepared by the first non-empty
    /// `write` instead of by [`SinkBuilder::start`].
    pub fn bootstrap_on_start(mut self, enabled: bool) -> Self {
        self.bootstrap_on_start = enabled;
        self
    }

    /// Validate the configuration, acquire the client and the dead-letter
    /// file, and prepare the destination.
    ///
    /// Resources acquired before a failing step are released before the
    /// error is returned.
    pub async fn start(self) -> Result<BulkIndexSink> {
        self.config.validate()?;

        let client = match self.client {
            Some(client) => client,
            None => default_client(&self.config)?,
        };

        let failures: Arc<dyn FailureSink> = match (self.failure_sink, &self.config.dlq_file) {
            (Some(sink), _) => sink,
            (None, Some(path)) => match DeadLetterQueue::open(path).await {
                Ok(dlq) => Arc::new(dlq),
                Err(e) => {
                    close_client(client.as_ref()).await;
                    return Err(SinkError::Io(e));
                }
            },
            (None, None) => Arc::new(DeadLetterQueue::log_only()),
        };

        let sink = BulkIndexSink {
            writer: BulkWriter::new(client.clone()),
            client,
            config: self.config,
            extractor: self.extractor,
            failures,
            bootstrapped: OnceCell::new(),
            metrics: SinkMetrics::default(),
        };

        if self.bootstrap_on_start {
            if let Err(e) = sink.ensure_destination().await {
                sink.stop().await;
                return Err(e);
            }
        }

        info!(
            alias = %sink.config.index_alias,
            mode = ?sink.config.write_mode,
            bulk_size_bytes = sink.config.bulk_size_bytes,
            "bulk index sink started"
        );
        Ok(sink)
    }
}

#[cfg(feature = "opensearch")]
fn default_client(config: &SinkConfig) -> Result<Arc<dyn IndexClient>> {
    let client = crate::opensearch::OpenSearchClient::new(&config.connection)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "opensearch"))]
fn default_client(_config: &SinkConfig) -> Result<Arc<dyn IndexClient>> {
    Err(SinkError::Config(
        "no IndexClient supplied and the `opensearch` feature is disabled".to_string(),
    ))
}

async fn close_client(client: &dyn IndexClient) {
    if let Err(e) = client.close().await {
        error!(error = %e, "failed to close index client");
    }
}

/// Batching bulk-write sink.
///
/// Each `write` call turns its records into bulk requests no larger than
/// the configured threshold, sends them one after another and routes every
/// rejected document to the failure sink. Concurrent `write` calls are fine:
/// batching state is local to each call.
pub struct BulkIndexSink {
    config: SinkConfig,
    client: Arc<dyn IndexClient>,
    writer: BulkWriter,
    extractor: Arc<dyn IdExtractor>,
    failures: Arc<dyn FailureSink>,
    bootstrapped: OnceCell<()>,
    metrics: SinkMetrics,
}

impl BulkIndexSink {
    pub fn builder(config: SinkConfig) -> SinkBuilder {
        SinkBuilder::new(config)
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Prepare the destination once; later calls return immediately.
    ///
    /// A failed attempt is not remembered, so the next call tries again.
    pub async fn ensure_destination(&self) -> Result<()> {
        self.bootstrapped
            .get_or_try_init(|| ensure_destination(self.client.as_ref(), &self.config))
            .await?;
        Ok(())
    }

    /// Write `records` in order.
    ///
    /// **Returns**
    /// - `Ok(true)` if every document was accepted (trivially for an empty
    ///   input, which makes no request at all).
    /// - `Ok(false)` if at least one document was rejected or a bulk request
    ///   failed. Every affected document has been handed to the failure sink
    ///   and all remaining batches were still sent.
    /// - `Err(..)` if the destination could not be prepared or a record is
    ///   not a JSON object. Batches already sent stay sent; the rest of the
    ///   input is not written.
    pub async fn write(&self, records: Vec<Record>) -> Result<bool> {
        if records.is_empty() {
            return Ok(true);
        }
        self.ensure_destination().await?;
        SinkMetrics::add(&self.metrics.records_received, records.len());

        let mut accumulator = BatchAccumulator::new(
            self.config.index_alias.clone(),
            self.config.bulk_size_bytes,
            self.extractor.clone(),
        );
        let mut success = true;
        let mut batches = 0usize;

        for record in records {
            accumulator.accumulate(record)?;
            if accumulator.is_ready() {
                success &= self.flush(accumulator.drain()).await;
                batches += 1;
            }
        }

        if accumulator.has_pending() {
            success &= self.flush(accumulator.drain()).await;
            batches += 1;
        }

        debug!(batches, success, "write finished");
        Ok(success)
    }

    /// Send one batch and route its failures; true if nothing failed.
    async fn flush(&self, batch: Batch) -> bool {
        let outcome = self.writer.send(&batch).await;
        SinkMetrics::add(&self.metrics.batches_sent, 1);
        let ok = outcome.is_success();

        match outcome {
            BulkOutcome::TransportFailure(cause) => {
                SinkMetrics::add(&self.metrics.transport_failures, 1);
                for operation in batch.into_operations() {
                    self.fail(FailureRecord::new(operation, cause.clone())).await;
                }
            }
            BulkOutcome::Transmitted(items) => {
                for (operation, item) in batch.into_operations().into_iter().zip(items) {
                    match item {
                        ItemOutcome::Success => SinkMetrics::add(&self.metrics.documents_written, 1),
                        ItemOutcome::Failure(cause) => {
                            self.fail(FailureRecord::new(operation, cause)).await
                        }
                    }
                }
            }
        }

        ok
    }

    async fn fail(&self, failure: FailureRecord) {
        SinkMetrics::add(&self.metrics.documents_failed, 1);
        self.failures.record(failure).await;
    }

    /// Release the client and close the failure sink.
    ///
    /// Close errors are logged, never returned.
    pub async fn stop(self) {
        close_client(self.client.as_ref()).await;
        if let Err(e) = self.failures.close().await {
            error!(error = %e, "failed to close dead-letter file");
        }
        info!(alias = %self.config.index_alias, "bulk index sink stopped");
    }
}
