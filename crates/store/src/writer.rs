//! Deduplicating batch writer.
//!
//! Accepts canonical records, drops same-session duplicates against the
//! shared processed-ID set, chunks the survivors to the adapter's batch
//! cap, and issues them with per-item outcome accounting. Throughput and
//! transient store failures retry the unstored subset with exponential
//! backoff + jitter; per-item rejections drop the one item and continue;
//! auth and missing-table outcomes abort the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use cm_domain::cancel::CancelToken;
use cm_domain::config::Config;
use cm_domain::record::CanonicalRecord;
use cm_domain::{Error, Result};

use crate::adapter::{Store, WriteOutcome, MAX_BATCH_ITEMS};
use crate::dedup::ProcessedIds;

/// Granularity of cancellable backoff sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);
/// Jitter stacked on each backoff, as a fraction of the computed delay.
const BACKOFF_JITTER_FRAC: f64 = 0.3;

/// A record the store permanently rejected.
#[derive(Debug, Clone)]
pub struct FailedWrite {
    pub id: String,
    pub outcome: WriteOutcome,
}

/// Accounting for one [`BatchWriter::write`] call.
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub stored: u64,
    pub duplicates_skipped: u64,
    pub retries: u64,
    pub failed: Vec<FailedWrite>,
    /// The call stopped early because the run was cancelled; remaining
    /// batches were dropped.
    pub cancelled: bool,
}

/// Shared writer driving one store adapter.
pub struct BatchWriter {
    store: Arc<dyn Store>,
    dedup: Arc<ProcessedIds>,
    batch_size: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn Store>, dedup: Arc<ProcessedIds>, cfg: &Config) -> Self {
        Self {
            store,
            dedup,
            batch_size: cfg.ingest.batch_size.clamp(1, MAX_BATCH_ITEMS),
            max_retries: cfg.api.rate_limit.max_retries,
            retry_delay: Duration::from_secs_f64(cfg.api.rate_limit.retry_delay.max(0.0)),
        }
    }

    /// Write a sequence of canonical records with at-most-once effective
    /// storage per id per session.
    ///
    /// Returns `Err` only for run-fatal store states.
    pub async fn write(
        &self,
        records: Vec<CanonicalRecord>,
        cancel: &CancelToken,
    ) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();

        // Same-session and same-call duplicate suppression. The in-memory
        // set is authoritative; no conditional-read against the store.
        let mut seen_in_call: HashSet<String> = HashSet::new();
        let mut survivors: Vec<CanonicalRecord> = Vec::with_capacity(records.len());
        for record in records {
            if self.dedup.contains(&record.id) || !seen_in_call.insert(record.id.clone()) {
                summary.duplicates_skipped += 1;
                continue;
            }
            survivors.push(record);
        }

        for chunk in survivors.chunks(self.batch_size) {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            self.write_chunk(chunk, cancel, &mut summary).await?;
            if summary.cancelled {
                break;
            }
        }

        Ok(summary)
    }

    /// Issue one chunk, retrying its unstored retryable subset.
    async fn write_chunk(
        &self,
        chunk: &[CanonicalRecord],
        cancel: &CancelToken,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        let mut pending: Vec<CanonicalRecord> = chunk.to_vec();

        for attempt in 0..=self.max_retries {
            let outcomes = self.store.batch_put(&pending).await;

            let mut stored_ids: Vec<String> = Vec::new();
            let mut retryable: Vec<(CanonicalRecord, WriteOutcome)> = Vec::new();

            for (record, outcome) in pending.into_iter().zip(outcomes) {
                match outcome {
                    WriteOutcome::Stored => stored_ids.push(record.id),
                    o if o.is_fatal() => {
                        // Record whatever landed before unwinding.
                        summary.stored += stored_ids.len() as u64;
                        self.dedup.record_stored(stored_ids);
                        return Err(match o {
                            WriteOutcome::TableMissing => {
                                Error::TableMissing("store table vanished mid-run".into())
                            }
                            _ => Error::Auth("store rejected credentials".into()),
                        });
                    }
                    o if o.is_retryable() => retryable.push((record, o)),
                    o => {
                        tracing::warn!(id = %record.id, outcome = ?o, "store rejected item");
                        summary.failed.push(FailedWrite {
                            id: record.id,
                            outcome: o,
                        });
                    }
                }
            }

            summary.stored += stored_ids.len() as u64;
            self.dedup.record_stored(stored_ids);

            if retryable.is_empty() {
                return Ok(());
            }
            if attempt == self.max_retries {
                tracing::warn!(
                    items = retryable.len(),
                    attempts = attempt + 1,
                    "store retries exhausted"
                );
                summary
                    .failed
                    .extend(retryable.into_iter().map(|(r, o)| FailedWrite {
                        id: r.id,
                        outcome: o,
                    }));
                return Ok(());
            }

            summary.retries += 1;
            if !self.backoff(attempt, cancel).await {
                summary.cancelled = true;
                // Partially-built work is dropped on cancel.
                return Ok(());
            }
            pending = retryable.into_iter().map(|(r, _)| r).collect();
        }

        Ok(())
    }

    /// Exponential backoff with jitter. Returns `false` when cancelled.
    async fn backoff(&self, attempt: u32, cancel: &CancelToken) -> bool {
        let base = self.retry_delay.as_secs_f64() * (2f64).powi(attempt.min(16) as i32);
        let jitter = rand::thread_rng().gen_range(0.0..=BACKOFF_JITTER_FRAC);
        let mut remaining = Duration::from_secs_f64(base * (1.0 + jitter));

        while remaining > Duration::ZERO {
            if cancel.is_cancelled() {
                return false;
            }
            let step = remaining.min(SLEEP_SLICE);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
        !cancel.is_cancelled()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
