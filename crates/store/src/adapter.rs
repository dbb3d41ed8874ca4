//! The minimal capability set the core requires of any key-value store.
//!
//! The concrete schema (hash key `id`, the secondary indexes) is a property
//! of the store collaborator; the core only guarantees the fields those
//! indexes need are populated on every canonical record.

use cm_domain::record::CanonicalRecord;
use cm_domain::Result;

use crate::BoxStream;

/// Hard per-call item cap of the adapter's `batch_put`.
pub const MAX_BATCH_ITEMS: usize = 25;

/// Result of probing for the configured table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableProbe {
    Exists,
    Missing,
    AuthFailed,
}

/// Per-item outcome of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    /// Store-side throughput cap; retry the item with backoff.
    ThroughputExceeded,
    /// Network-ish store failure; retry the item with backoff.
    Transient,
    Timeout,
    /// The store's conditional check rejected the item; drop it.
    ConditionalCheckFailed,
    /// The store rejected the item's shape; drop it.
    ValidationRejected,
    /// Fatal for the whole run.
    AuthFailed,
    /// Fatal for the whole run.
    TableMissing,
}

impl WriteOutcome {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            WriteOutcome::ThroughputExceeded | WriteOutcome::Transient | WriteOutcome::Timeout
        )
    }

    /// Permanent for this one item only; the batch continues.
    pub fn is_item_rejection(self) -> bool {
        matches!(
            self,
            WriteOutcome::ConditionalCheckFailed | WriteOutcome::ValidationRejected
        )
    }

    pub fn is_fatal(self) -> bool {
        matches!(self, WriteOutcome::AuthFailed | WriteOutcome::TableMissing)
    }
}

/// A wide-column key-value store, as the ingestion core sees it.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Probe for a table before the first write of a run.
    async fn describe_table(&self, table: &str) -> TableProbe;

    /// Write a single record.
    async fn put_item(&self, record: &CanonicalRecord) -> WriteOutcome;

    /// Write up to [`MAX_BATCH_ITEMS`] records, returning one outcome per
    /// input item, in input order.
    async fn batch_put(&self, records: &[CanonicalRecord]) -> Vec<WriteOutcome>;

    /// Lazily enumerate records from a secondary index by hash key and an
    /// optional range-key prefix.
    async fn query_prefix(
        &self,
        index: &str,
        hash: &str,
        range_prefix: Option<&str>,
    ) -> Result<BoxStream<'static, CanonicalRecord>>;
}
