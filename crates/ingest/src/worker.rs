//! The per-sub-window worker: drives one work item from dispatch through
//! traversal, validation, and batched writes.
//!
//! A worker owns its sub-window end-to-end and iterates it date by date,
//! so dedup-reset boundaries and cancellation land on whole-date edges.
//! Workers share only the governor, the processed-ID set, and the metrics
//! aggregator.

use std::sync::Arc;

use futures_util::StreamExt;

use cm_client::fetch::PageFetch;
use cm_client::governor::RateGovernor;
use cm_client::traverse::{traverse, PageEvent, TraversalStatus};
use cm_client::CancelToken;
use cm_domain::config::Config;
use cm_domain::family::Family;
use cm_domain::record::CanonicalRecord;
use cm_domain::window::DateWindow;
use cm_domain::{Error, Result};
use cm_normalize::normalize;
use cm_store::dedup::ResetBoundary;
use cm_store::{BatchWriter, ProcessedIds};

use crate::metrics::RunMetrics;
use crate::partition::WorkItem;

/// Everything a worker needs, cloned per worker task.
#[derive(Clone)]
pub struct WorkerCtx {
    pub fetch: Arc<dyn PageFetch>,
    pub governor: Arc<RateGovernor>,
    pub writer: Arc<BatchWriter>,
    pub dedup: Arc<ProcessedIds>,
    pub metrics: Arc<RunMetrics>,
    pub config: Arc<Config>,
    pub cancel: CancelToken,
}

/// Terminal state of one sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    Completed,
    Partial,
    Failed,
    Cancelled,
}

/// Drive one work item through fetch → validate → write.
///
/// Returns `Err` only for run-fatal conditions (upstream auth rejection,
/// store auth/table loss); everything else is absorbed into the outcome
/// and the metrics.
pub async fn process_window(ctx: &WorkerCtx, item: &WorkItem) -> Result<WindowOutcome> {
    let family = item.family;
    ctx.dedup.maybe_reset(ResetBoundary::RangeStart);

    let mut dates_ok: u64 = 0;
    let mut dates_bad: u64 = 0;

    for date in item.window.days() {
        if ctx.cancel.is_cancelled() {
            return Ok(WindowOutcome::Cancelled);
        }
        ctx.dedup.maybe_reset(ResetBoundary::DateStart);

        let day = DateWindow::single_day(date);
        let mut buffer: Vec<CanonicalRecord> = Vec::new();
        let mut terminal = None;

        {
            let mut stream = traverse(
                ctx.fetch.as_ref(),
                &ctx.governor,
                &ctx.cancel,
                family,
                day,
                ctx.config.ingest.page_size,
                ctx.config.api.rate_limit.max_retries,
            );

            while let Some(event) = stream.next().await {
                match event {
                    PageEvent::Record(raw) => {
                        ingest_record(ctx, family, &raw, &mut buffer).await?;
                    }
                    PageEvent::Finished(end) => terminal = Some(end),
                }
            }
        }

        let Some(end) = terminal else {
            // The traversal stream always finishes; treat a missing
            // terminal as a failed date so the window degrades instead of
            // lying about completeness.
            dates_bad += 1;
            continue;
        };

        ctx.metrics.add_requested(family, end.requests);
        ctx.metrics.add_retries(family, end.retries);
        ctx.metrics.add_rate_limit_waits(family, end.rate_limit_waits);

        if end.auth_failure {
            return Err(Error::Auth(
                end.message.unwrap_or_else(|| "upstream auth failure".into()),
            ));
        }

        match end.status {
            TraversalStatus::Cancelled => {
                // Partially-built batches are dropped on cancel.
                return Ok(WindowOutcome::Cancelled);
            }
            TraversalStatus::Completed => {
                if flush(ctx, family, &mut buffer).await? {
                    return Ok(WindowOutcome::Cancelled);
                }
                ctx.metrics.date_completed();
                dates_ok += 1;
            }
            TraversalStatus::Partial { ref reason, last_offset } => {
                tracing::warn!(
                    family = %family,
                    date = %date,
                    reason = %reason,
                    last_offset,
                    "date traversal incomplete"
                );
                // Keep what upstream did give us.
                if flush(ctx, family, &mut buffer).await? {
                    return Ok(WindowOutcome::Cancelled);
                }
                dates_bad += 1;
            }
            TraversalStatus::Failed { kind } => {
                tracing::warn!(family = %family, date = %date, kind = kind.tag(), "date traversal failed");
                if flush(ctx, family, &mut buffer).await? {
                    return Ok(WindowOutcome::Cancelled);
                }
                dates_bad += 1;
            }
        }
    }

    Ok(match (dates_ok, dates_bad) {
        (_, 0) => WindowOutcome::Completed,
        (0, _) => WindowOutcome::Failed,
        _ => WindowOutcome::Partial,
    })
}

/// Validate one raw record into the write buffer, flushing when full.
async fn ingest_record(
    ctx: &WorkerCtx,
    family: Family,
    raw: &serde_json::Value,
    buffer: &mut Vec<CanonicalRecord>,
) -> Result<()> {
    ctx.metrics.add_received(family, 1);

    match normalize(family, raw, ctx.config.ingest.date_ranges.min_date) {
        Ok(record) => {
            ctx.metrics.add_validated(family, 1);
            buffer.push(record);
            if buffer.len() >= ctx.config.ingest.batch_size {
                flush(ctx, family, buffer).await?;
            }
        }
        Err(rejection) => {
            ctx.metrics.add_failed_validation(family, 1);
            tracing::warn!(family = %family, rejection = %rejection, "record failed validation");
        }
    }
    Ok(())
}

/// Drain the buffer through the writer. Returns `true` when the run was
/// cancelled mid-write.
async fn flush(ctx: &WorkerCtx, family: Family, buffer: &mut Vec<CanonicalRecord>) -> Result<bool> {
    if buffer.is_empty() {
        return Ok(false);
    }
    let summary = ctx
        .writer
        .write(std::mem::take(buffer), &ctx.cancel)
        .await?;

    ctx.metrics.add_stored(family, summary.stored);
    ctx.metrics
        .add_duplicates_skipped(family, summary.duplicates_skipped);
    ctx.metrics
        .add_failed_store(family, summary.failed.len() as u64);
    ctx.metrics.add_retries(family, summary.retries);

    Ok(summary.cancelled)
}
