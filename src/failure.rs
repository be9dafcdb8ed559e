use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::record::FailureRecord;

/// Destination for documents the store did not accept.
///
/// `record` never fails: a sink that cannot persist a failure must report
/// it on its own and carry on.
#[async_trait]
pub trait FailureSink: Send + Sync {
    async fn record(&self, failure: FailureRecord);

    /// Flush and release any underlying handle.
    ///
    /// Default implementation is a no-op.
    async fn close(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Dead-letter queue backed by an append-only NDJSON file.
///
/// Without a file, failures are logged at `warn` level instead.
pub struct DeadLetterQueue {
    file: Option<Mutex<Option<File>>>,
    /// Entries that could not be persisted.
    pub write_failures: AtomicU64,
}

impl DeadLetterQueue {
    /// Open (or create) `path` in append mode.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .await?;
        Ok(DeadLetterQueue {
            file: Some(Mutex::new(Some(file))),
            write_failures: AtomicU64::new(0),
        })
    }

    /// Queue that only logs.
    pub fn log_only() -> Self {
        DeadLetterQueue {
            file: None,
            write_failures: AtomicU64::new(0),
        }
    }

    pub fn is_durable(&self) -> bool {
        self.file.is_some()
    }
}

#[async_trait]
impl FailureSink for DeadLetterQueue {
    async fn record(&self, failure: FailureRecord) {
        let Some(file) = &self.file else {
            warn!(
                index = %failure.operation.index,
                id = ?failure.operation.id,
                document = %failure.operation.raw,
                cause = %failure.cause,
                "document rejected"
            );
            return;
        };

        let line = match failure.to_json_line() {
            Ok(line) => line + "\n",
            Err(e) => {
                self.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(document = %failure.operation.raw, error = %e, "could not encode dead-letter entry");
                return;
            }
        };

        let mut guard = file.lock().await;
        let result = match guard.as_mut() {
            Some(f) => match f.write_all(line.as_bytes()).await {
                Ok(()) => f.flush().await,
                Err(e) => Err(e),
            },
            None => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "dead-letter file already closed",
            )),
        };

        if let Err(e) = result {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            error!(document = %failure.operation.raw, error = %e, "dead-letter write failed");
        }
    }

    async fn close(&self) -> std::io::Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        match file.lock().await.take() {
            Some(mut f) => {
                f.flush().await?;
                f.sync_all().await
            }
            None => Ok(()),
        }
    }
}
