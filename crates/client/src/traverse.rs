//! Paginated traversal of one (family, window) pair.
//!
//! Walks a list endpoint from offset 0 until upstream signals the end of
//! the window, emitting raw records one at a time in upstream order and
//! finishing with a terminal summary. Retryable page failures go back
//! through the governor's adaptive wait before the page is re-requested;
//! a page is never partially emitted.

use serde_json::Value;

use cm_domain::family::Family;
use cm_domain::window::DateWindow;

use cm_domain::cancel::CancelToken;
use crate::fetch::{PageFetch, PageResponse};
use crate::governor::{RateGovernor, WaitOutcome};
use crate::outcome::FetchOutcome;
use crate::BoxStream;

/// Safety cap on pages per traversal call; a window that deep is a paging
/// bug upstream, not data.
const MAX_PAGES: u32 = 100_000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Terminal outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalStatus {
    /// Every page in the window was drained.
    Completed,
    /// Some pages were drained, then retries ran out.
    Partial { reason: String, last_offset: u64 },
    /// The window failed without draining.
    Failed { kind: FetchOutcome },
    Cancelled,
}

/// Terminal summary of one traversal call.
#[derive(Debug, Clone)]
pub struct TraversalEnd {
    pub status: TraversalStatus,
    /// Pages successfully drained.
    pub pages: u32,
    /// Records emitted.
    pub records: u64,
    /// HTTP requests issued, including retries.
    pub requests: u64,
    /// Page retries performed.
    pub retries: u64,
    /// Rate-limit signals observed.
    pub rate_limit_waits: u64,
    /// Upstream rejected our credentials; the caller must abort the run.
    pub auth_failure: bool,
    pub message: Option<String>,
}

impl TraversalEnd {
    fn new(status: TraversalStatus) -> Self {
        Self {
            status,
            pages: 0,
            records: 0,
            requests: 0,
            retries: 0,
            rate_limit_waits: 0,
            auth_failure: false,
            message: None,
        }
    }
}

/// Events yielded by [`traverse`]: records, then exactly one `Finished`.
#[derive(Debug, Clone)]
pub enum PageEvent {
    Record(Value),
    Finished(TraversalEnd),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Traversal
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Enumerate every record of `family` in `window`.
///
/// The stream yields each raw record once, in upstream list order, and
/// terminates with a single [`PageEvent::Finished`] carrying the outcome
/// and counters. `max_retries = 0` gives every page exactly one attempt.
pub fn traverse<'a>(
    fetch: &'a dyn PageFetch,
    governor: &'a RateGovernor,
    cancel: &'a CancelToken,
    family: Family,
    window: DateWindow,
    limit: u64,
    max_retries: u32,
) -> BoxStream<'a, PageEvent> {
    Box::pin(async_stream::stream! {
        let mut end = TraversalEnd::new(TraversalStatus::Completed);
        let mut offset: u64 = 0;
        let mut failures_this_page: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                end.status = TraversalStatus::Cancelled;
                break;
            }

            match governor.acquire(family, cancel).await {
                WaitOutcome::Proceed { .. } => {}
                WaitOutcome::Cancelled => {
                    end.status = TraversalStatus::Cancelled;
                    break;
                }
            }

            end.requests += 1;
            match fetch.fetch_page(family, window, offset, limit).await {
                PageResponse::Page(page) => {
                    governor.record(family, FetchOutcome::Ok);
                    failures_this_page = 0;
                    end.pages += 1;

                    let count = page.records.len() as u64;
                    for record in page.records {
                        yield PageEvent::Record(record);
                    }
                    end.records += count;

                    if count == 0 || !page.has_more {
                        end.status = TraversalStatus::Completed;
                        break;
                    }
                    offset += count;

                    if end.pages >= MAX_PAGES {
                        end.status = TraversalStatus::Partial {
                            reason: "page cap reached".into(),
                            last_offset: offset,
                        };
                        break;
                    }
                }
                PageResponse::Failed(err) => {
                    governor.record(family, err.outcome);

                    if err.outcome == FetchOutcome::RateLimited {
                        end.rate_limit_waits += 1;
                        if let Some(hint) = err.retry_after {
                            governor.record_retry_after(family, hint);
                        }
                    }

                    if err.is_auth() {
                        tracing::error!(family = %family, message = %err.message, "upstream auth failure");
                        end.status = TraversalStatus::Failed { kind: err.outcome };
                        end.auth_failure = true;
                        end.message = Some(err.message);
                        break;
                    }

                    if !err.outcome.is_retryable() {
                        tracing::warn!(
                            family = %family,
                            window = %window,
                            offset,
                            message = %err.message,
                            "permanent page failure"
                        );
                        end.status = TraversalStatus::Failed { kind: err.outcome };
                        end.message = Some(err.message);
                        break;
                    }

                    failures_this_page += 1;
                    if failures_this_page > max_retries {
                        end.status = TraversalStatus::Partial {
                            reason: format!(
                                "retries exhausted after {failures_this_page} {} failures",
                                err.outcome.tag()
                            ),
                            last_offset: offset,
                        };
                        end.message = Some(err.message);
                        break;
                    }
                    end.retries += 1;
                    tracing::debug!(
                        family = %family,
                        offset,
                        attempt = failures_this_page,
                        outcome = err.outcome.tag(),
                        "retrying page"
                    );
                }
            }
        }

        tracing::debug!(
            family = %family,
            window = %window,
            pages = end.pages,
            records = end.records,
            retries = end.retries,
            status = ?end.status,
            "traversal finished"
        );
        yield PageEvent::Finished(end);
    })
}
