//! The single entry point the run driver calls.
//!
//! Validates config, preflights the store, partitions the work, fans it
//! out over a fixed worker set, and assembles the structured run report.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use cm_client::fetch::PageFetch;
use cm_client::governor::RateGovernor;
use cm_client::CancelToken;
use cm_domain::config::{Config, ConfigSeverity};
use cm_domain::report::{RunReport, RunRequest, TerminalState};
use cm_domain::{Error, Result};
use cm_store::adapter::{Store, TableProbe};
use cm_store::{BatchWriter, ProcessedIds};

use crate::metrics::RunMetrics;
use crate::partition::{partition, WorkItem};
use crate::worker::{process_window, WindowOutcome, WorkerCtx};

/// Execute one run request against the given upstream and store.
///
/// Item-level failures never abort the run; run-fatal conditions (invalid
/// config, missing table, auth rejection) return `Err` immediately. A
/// cooperative cancel ends the run with a `cancelled` report, not an
/// error.
pub async fn run(
    request: RunRequest,
    config: Arc<Config>,
    fetch: Arc<dyn PageFetch>,
    store: Arc<dyn Store>,
    cancel: CancelToken,
) -> Result<RunReport> {
    let started_at = Utc::now();

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        return Err(Error::Config(format!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        )));
    }

    // ── Store preflight ──────────────────────────────────────────────
    match store.describe_table(&config.store.table_name).await {
        TableProbe::Exists => {}
        TableProbe::Missing => {
            return Err(Error::TableMissing(config.store.table_name.clone()));
        }
        TableProbe::AuthFailed => {
            return Err(Error::Auth("store rejected credentials".into()));
        }
    }

    // ── Partition & shared state ─────────────────────────────────────
    let today = Utc::now().date_naive();
    let items = partition(&request, &config, today)?;

    let governor = Arc::new(RateGovernor::new(&config.api));
    let dedup = Arc::new(ProcessedIds::new(&config.store.deduplication));
    let writer = Arc::new(BatchWriter::new(store, dedup.clone(), &config));
    let metrics = Arc::new(RunMetrics::new());

    let worker_count = config.ingest.parallel.max_workers.min(items.len().max(1));
    let queue: Arc<Mutex<VecDeque<WorkItem>>> = Arc::new(Mutex::new(items.into()));
    let fatal: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));

    tracing::info!(workers = worker_count, "dispatching workers");

    // ── Worker fan-out ───────────────────────────────────────────────
    let mut handles = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let ctx = WorkerCtx {
            fetch: fetch.clone(),
            governor: governor.clone(),
            writer: writer.clone(),
            dedup: dedup.clone(),
            metrics: metrics.clone(),
            config: config.clone(),
            cancel: cancel.clone(),
        };
        let queue = queue.clone();
        let fatal = fatal.clone();
        let chunk_size = config.ingest.parallel.chunk_size;

        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, ctx, queue, fatal, chunk_size).await;
        }));
    }
    for handle in handles {
        // A panicked worker is a bug, not a data condition; surface it.
        handle
            .await
            .map_err(|e| Error::Other(format!("worker task failed: {e}")))?;
    }

    if let Some(error) = fatal.lock().take() {
        return Err(error);
    }

    // ── Report assembly ──────────────────────────────────────────────
    let snap = metrics.snapshot();
    let state = if cancel.is_cancelled() {
        TerminalState::Cancelled
    } else if snap.windows.failed > 0 && snap.windows.completed == 0 && snap.windows.partial == 0 {
        TerminalState::Failed
    } else if snap.windows.partial > 0 || snap.windows.failed > 0 {
        TerminalState::Partial
    } else {
        TerminalState::Ok
    };

    for endpoint in governor.snapshot() {
        tracing::debug!(
            family = %endpoint.family,
            health_factor = endpoint.health_factor,
            error_rate = endpoint.error_rate,
            "endpoint health at run end"
        );
    }

    let report = RunReport {
        state,
        started_at,
        finished_at: Utc::now(),
        totals: snap.totals,
        families: snap.families,
        windows: snap.windows,
        dates_completed: snap.dates_completed,
    };
    tracing::info!(
        state = ?report.state,
        stored = report.totals.stored,
        duplicates_skipped = report.totals.duplicates_skipped,
        failed_validation = report.totals.failed_validation,
        "run finished"
    );
    Ok(report)
}

/// Pull work items (`chunk_size` at a time) until the queue drains, the
/// run is cancelled, or a fatal error lands.
async fn worker_loop(
    worker_id: usize,
    ctx: WorkerCtx,
    queue: Arc<Mutex<VecDeque<WorkItem>>>,
    fatal: Arc<Mutex<Option<Error>>>,
    chunk_size: usize,
) {
    loop {
        if ctx.cancel.is_cancelled() || fatal.lock().is_some() {
            return;
        }

        let claimed: Vec<WorkItem> = {
            let mut queue = queue.lock();
            let take = chunk_size.max(1).min(queue.len());
            queue.drain(..take).collect()
        };
        if claimed.is_empty() {
            return;
        }

        for item in claimed {
            if ctx.cancel.is_cancelled() {
                return;
            }
            tracing::debug!(worker_id, family = %item.family, window = %item.window, "processing sub-window");
            match process_window(&ctx, &item).await {
                Ok(WindowOutcome::Completed) => ctx.metrics.window_completed(),
                Ok(WindowOutcome::Partial) => ctx.metrics.window_partial(),
                Ok(WindowOutcome::Failed) => ctx.metrics.window_failed(),
                Ok(WindowOutcome::Cancelled) => return,
                Err(error) => {
                    tracing::error!(
                        worker_id,
                        family = %item.family,
                        error = %error,
                        "run-fatal error, unwinding"
                    );
                    *fatal.lock() = Some(error);
                    // Stop the other workers too.
                    ctx.cancel.cancel();
                    return;
                }
            }
        }
    }
}
