use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for a [`crate::sink::BulkIndexSink`].
///
/// All counters are monotonically increasing and updated with relaxed
/// ordering; read them through [`SinkMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Records handed to `write`, including ones later rejected.
    pub records_received: AtomicU64,
    /// Documents the store acknowledged.
    pub documents_written: AtomicU64,
    /// Documents routed to the failure sink.
    pub documents_failed: AtomicU64,
    /// Bulk requests attempted.
    pub batches_sent: AtomicU64,
    /// Bulk requests that failed as a whole.
    pub transport_failures: AtomicU64,
}

/// Point-in-time copy of [`SinkMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub documents_written: u64,
    pub documents_failed: u64,
    pub batches_sent: u64,
    pub transport_failures: u64,
}

impl SinkMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            documents_written: self.documents_written.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}
