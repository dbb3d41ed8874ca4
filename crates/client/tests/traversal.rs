//! Traversal engine behavior against scripted page fetchers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};

use cm_client::cancel::CancelToken;
use cm_client::fetch::{Page, PageError, PageFetch, PageResponse};
use cm_client::governor::RateGovernor;
use cm_client::outcome::FetchOutcome;
use cm_client::traverse::{traverse, PageEvent, TraversalStatus};
use cm_domain::config::ApiConfig;
use cm_domain::family::Family;
use cm_domain::window::DateWindow;

// ── fixtures ──────────────────────────────────────────────────────

/// Replays a fixed sequence of page responses, then empty pages.
struct ScriptedFetch {
    script: Mutex<VecDeque<PageResponse>>,
}

impl ScriptedFetch {
    fn new(responses: Vec<PageResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
        }
    }
}

#[async_trait::async_trait]
impl PageFetch for ScriptedFetch {
    async fn fetch_page(
        &self,
        _family: Family,
        _window: DateWindow,
        _offset: u64,
        _limit: u64,
    ) -> PageResponse {
        self.script.lock().pop_front().unwrap_or_else(|| {
            PageResponse::Page(Page {
                records: Vec::new(),
                has_more: false,
            })
        })
    }
}

fn page(records: Vec<Value>, has_more: bool) -> PageResponse {
    PageResponse::Page(Page { records, has_more })
}

fn failure(outcome: FetchOutcome, status: u16) -> PageResponse {
    PageResponse::Failed(PageError {
        outcome,
        status: Some(status),
        retry_after: None,
        message: format!("HTTP {status}"),
    })
}

fn bill(n: u32) -> Value {
    json!({"congress": 118, "type": "HR", "number": n.to_string()})
}

fn governor() -> RateGovernor {
    let mut cfg = ApiConfig::default();
    cfg.rate_limit.requests_per_second = 100.0;
    RateGovernor::new(&cfg)
}

fn window() -> DateWindow {
    DateWindow::single_day("2024-01-20".parse().unwrap())
}

/// Drain the stream into (records, terminal summary).
async fn drain(
    fetch: &dyn PageFetch,
    gov: &RateGovernor,
    cancel: &CancelToken,
    max_retries: u32,
) -> (Vec<Value>, cm_client::traverse::TraversalEnd) {
    let mut stream = traverse(fetch, gov, cancel, Family::Bill, window(), 250, max_retries);
    let mut records = Vec::new();
    let mut end = None;
    while let Some(event) = stream.next().await {
        match event {
            PageEvent::Record(r) => records.push(r),
            PageEvent::Finished(e) => end = Some(e),
        }
    }
    (records, end.expect("stream must finish"))
}

// ── scenarios ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn happy_path_three_pages() {
    let fetch = ScriptedFetch::new(vec![
        page(vec![bill(1), bill(2)], true),
        page(vec![bill(3), bill(4)], true),
        page(vec![bill(5), bill(6)], false),
    ]);
    let gov = governor();
    let cancel = CancelToken::new();

    let (records, end) = drain(&fetch, &gov, &cancel, 3).await;
    assert_eq!(records.len(), 6);
    assert_eq!(end.status, TraversalStatus::Completed);
    assert_eq!(end.pages, 3);
    assert_eq!(end.requests, 3);
    assert_eq!(end.retries, 0);
    assert_eq!(end.rate_limit_waits, 0);
}

#[tokio::test(start_paused = true)]
async fn records_keep_upstream_order_and_appear_once() {
    let fetch = ScriptedFetch::new(vec![
        page(vec![bill(1), bill(2)], true),
        page(vec![bill(3)], false),
    ]);
    let gov = governor();
    let cancel = CancelToken::new();

    let (records, _) = drain(&fetch, &gov, &cancel, 3).await;
    let numbers: Vec<&str> = records
        .iter()
        .map(|r| r["number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["1", "2", "3"]);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_then_succeed() {
    let fetch = ScriptedFetch::new(vec![
        failure(FetchOutcome::Transient, 503),
        failure(FetchOutcome::Transient, 503),
        page(vec![bill(1), bill(2), bill(3), bill(4)], false),
    ]);
    let gov = governor();
    let cancel = CancelToken::new();

    let (records, end) = drain(&fetch, &gov, &cancel, 3).await;
    assert_eq!(records.len(), 4);
    assert_eq!(end.status, TraversalStatus::Completed);
    assert_eq!(end.retries, 2);
    assert_eq!(end.requests, 3);
}

#[tokio::test(start_paused = true)]
async fn max_retries_zero_never_retries() {
    let fetch = ScriptedFetch::new(vec![failure(FetchOutcome::Transient, 503)]);
    let gov = governor();
    let cancel = CancelToken::new();

    let (records, end) = drain(&fetch, &gov, &cancel, 0).await;
    assert!(records.is_empty());
    assert_eq!(end.retries, 0);
    assert_eq!(end.requests, 1);
    assert!(matches!(end.status, TraversalStatus::Partial { .. }));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_hint_delays_the_retry() {
    let fetch = ScriptedFetch::new(vec![
        PageResponse::Failed(PageError {
            outcome: FetchOutcome::RateLimited,
            status: Some(429),
            retry_after: Some(Duration::from_secs(2)),
            message: "HTTP 429".into(),
        }),
        page(vec![bill(1)], false),
    ]);
    let gov = governor();
    let cancel = CancelToken::new();

    let before = tokio::time::Instant::now();
    let (records, end) = drain(&fetch, &gov, &cancel, 3).await;
    let elapsed = tokio::time::Instant::now() - before;

    assert_eq!(records.len(), 1);
    assert_eq!(end.rate_limit_waits, 1);
    assert_eq!(end.retries, 1);
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_is_fatal_for_the_page() {
    let fetch = ScriptedFetch::new(vec![failure(FetchOutcome::Permanent, 404)]);
    let gov = governor();
    let cancel = CancelToken::new();

    let (records, end) = drain(&fetch, &gov, &cancel, 3).await;
    assert!(records.is_empty());
    assert_eq!(
        end.status,
        TraversalStatus::Failed {
            kind: FetchOutcome::Permanent
        }
    );
    assert_eq!(end.retries, 0);
    assert!(!end.auth_failure);
}

#[tokio::test(start_paused = true)]
async fn auth_rejection_is_flagged_for_run_abort() {
    let fetch = ScriptedFetch::new(vec![failure(FetchOutcome::Permanent, 403)]);
    let gov = governor();
    let cancel = CancelToken::new();

    let (_, end) = drain(&fetch, &gov, &cancel, 3).await;
    assert!(end.auth_failure);
    assert!(matches!(end.status, TraversalStatus::Failed { .. }));
}

#[tokio::test(start_paused = true)]
async fn empty_first_page_completes_with_zero_records() {
    let fetch = ScriptedFetch::new(vec![page(vec![], false)]);
    let gov = governor();
    let cancel = CancelToken::new();

    let (records, end) = drain(&fetch, &gov, &cancel, 3).await;
    assert!(records.is_empty());
    assert_eq!(end.status, TraversalStatus::Completed);
    assert_eq!(end.pages, 1);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_run_issues_no_requests() {
    let fetch = ScriptedFetch::new(vec![page(vec![bill(1)], false)]);
    let gov = governor();
    let cancel = CancelToken::new();
    cancel.cancel();

    let (records, end) = drain(&fetch, &gov, &cancel, 3).await;
    assert!(records.is_empty());
    assert_eq!(end.status, TraversalStatus::Cancelled);
    assert_eq!(end.requests, 0);
}

#[tokio::test(start_paused = true)]
async fn backoff_spaces_out_transient_retries() {
    // Two failures then success, at 1 req/s: the third attempt must sit
    // behind at least base * 2^2 = 4s of accumulated backoff.
    let fetch = ScriptedFetch::new(vec![
        failure(FetchOutcome::Transient, 503),
        failure(FetchOutcome::Transient, 503),
        page(vec![bill(1)], false),
    ]);
    let mut cfg = ApiConfig::default();
    cfg.rate_limit.requests_per_second = 1.0;
    let gov = RateGovernor::new(&cfg);
    let cancel = CancelToken::new();

    let before = tokio::time::Instant::now();
    let (records, end) = drain(&fetch, &gov, &cancel, 3).await;
    let elapsed = tokio::time::Instant::now() - before;

    assert_eq!(records.len(), 1);
    assert_eq!(end.retries, 2);
    assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn fetch_arc_can_be_shared_across_calls() {
    let fetch: Arc<dyn PageFetch> = Arc::new(ScriptedFetch::new(vec![
        page(vec![bill(1)], false),
        page(vec![bill(2)], false),
    ]));
    let gov = governor();
    let cancel = CancelToken::new();

    let (first, _) = drain(fetch.as_ref(), &gov, &cancel, 3).await;
    let (second, _) = drain(fetch.as_ref(), &gov, &cancel, 3).await;
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
}
