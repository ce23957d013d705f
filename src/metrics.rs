use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing assistant activity since startup.
#[derive(Default)]
pub struct AssistantMetrics {
    documents_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
    summaries_generated: AtomicU64,
    queries_answered: AtomicU64,
    related_searches: AtomicU64,
}

impl AssistantMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingested document and the number of chunks indexed for it.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a completed summary request.
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed question-answering request.
    pub fn record_query(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed related-paper lookup.
    pub fn record_related(&self) {
        self.related_searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
            related_searches: self.related_searches.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested since startup.
    pub documents_ingested: u64,
    /// Total chunk count indexed across all ingested documents.
    pub chunks_indexed: u64,
    /// Number of summaries produced.
    pub summaries_generated: u64,
    /// Number of questions answered.
    pub queries_answered: u64,
    /// Number of related-paper lookups served.
    pub related_searches: u64,
}
