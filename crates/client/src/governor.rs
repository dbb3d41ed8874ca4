//! Per-family request pacing and adaptive backoff.
//!
//! The governor is shared by every worker. Before each upstream call a
//! worker acquires a dispatch slot for the target family; the governor
//! suspends it until the family's effective interval has elapsed since the
//! previous dispatch, stretching that interval while the endpoint is
//! unhealthy and honoring explicit `Retry-After` hints from upstream.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;

use cm_domain::config::ApiConfig;
use cm_domain::family::Family;

use cm_domain::cancel::CancelToken;
use crate::outcome::FetchOutcome;

/// Jitter applied to every computed interval, as a fraction of the base.
const JITTER_FRAC: f64 = 0.15;
/// Backoff multiplier ceiling.
const MAX_BACKOFF_MULTIPLIER: f64 = 120.0;
/// Health factor domain (additive-increase, multiplicative-decrease).
const HEALTH_MIN: f64 = 1.0;
const HEALTH_MAX: f64 = 8.0;
const HEALTH_INCREASE: f64 = 0.5;
const HEALTH_DECAY: f64 = 0.9;
/// Rolling window for the diagnostic error rate.
const ERROR_WINDOW: usize = 20;
/// Granularity of cancellable sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);
/// Extra random delay stacked on a `Retry-After` hint, milliseconds.
const RETRY_AFTER_JITTER_MS: u64 = 300;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-endpoint health state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
struct EndpointHealth {
    consecutive_errors: u32,
    health_factor: f64,
    /// Last `ERROR_WINDOW` outcomes; `true` = failure. Diagnostic only.
    recent: VecDeque<bool>,
    /// Reserved instant of the next permitted dispatch.
    next_dispatch: Option<Instant>,
    /// Absolute deadline imposed by an upstream `Retry-After` hint.
    retry_after_until: Option<Instant>,
}

impl EndpointHealth {
    fn new() -> Self {
        Self {
            consecutive_errors: 0,
            health_factor: HEALTH_MIN,
            recent: VecDeque::with_capacity(ERROR_WINDOW),
            next_dispatch: None,
            retry_after_until: None,
        }
    }

    fn push_outcome(&mut self, failed: bool) {
        if self.recent.len() == ERROR_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(failed);
    }

    fn error_rate(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        let errors = self.recent.iter().filter(|f| **f).count();
        errors as f64 / self.recent.len() as f64
    }
}

/// Diagnostic snapshot of one family's pacing state.
#[derive(Debug, Clone)]
pub struct EndpointHealthSnapshot {
    pub family: Family,
    pub consecutive_errors: u32,
    pub health_factor: f64,
    pub error_rate: f64,
    pub effective_rate: f64,
}

/// Result of an [`RateGovernor::acquire`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The slot was acquired after waiting for the given duration.
    Proceed { waited: Duration },
    /// The run was cancelled while waiting.
    Cancelled,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interval math
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the wait interval before the next dispatch.
///
/// `jitter_frac` is the sampled jitter in `[-JITTER_FRAC, +JITTER_FRAC]`;
/// it is a parameter so the dynamics stay testable.
pub fn wait_interval(
    base_interval: Duration,
    jitter_frac: f64,
    health_factor: f64,
    consecutive_errors: u32,
) -> Duration {
    let base = base_interval.as_secs_f64();
    let jittered = base + base * jitter_frac;
    let backoff = if consecutive_errors > 0 {
        let exp = (consecutive_errors + 1).min(63);
        (2f64).powi(exp as i32).min(MAX_BACKOFF_MULTIPLIER)
    } else {
        1.0
    };
    let secs = (jittered * health_factor * backoff).max(0.0);
    Duration::from_secs_f64(secs)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RateGovernor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared, thread-safe pacing + adaptive-backoff state for all families.
///
/// Run-scoped: created at run start, dropped at run end. Entries are
/// created on first use.
pub struct RateGovernor {
    default_rate: f64,
    overrides: HashMap<Family, f64>,
    states: Mutex<HashMap<Family, EndpointHealth>>,
}

impl RateGovernor {
    pub fn new(cfg: &ApiConfig) -> Self {
        Self {
            default_rate: cfg.rate_limit.requests_per_second,
            overrides: cfg.endpoint_rate_limits.clone(),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Effective requests/second for a family. Clamped well above zero so
    /// the interval stays a representable duration.
    pub fn rate_for(&self, family: Family) -> f64 {
        self.overrides
            .get(&family)
            .copied()
            .unwrap_or(self.default_rate)
            .max(1e-3)
    }

    /// Acquire a dispatch slot for `family`, waiting out the family's
    /// current interval. The wait observes `cancel` and returns promptly
    /// with [`WaitOutcome::Cancelled`] when the run is cancelled.
    pub async fn acquire(&self, family: Family, cancel: &CancelToken) -> WaitOutcome {
        let dispatch_at = self.reserve_slot(family);
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= dispatch_at {
                return WaitOutcome::Proceed {
                    waited: now - started,
                };
            }
            let step = (dispatch_at - now).min(SLEEP_SLICE);
            tokio::time::sleep(step).await;
        }
    }

    /// Compute and reserve this family's next dispatch instant. Reserving
    /// under the lock serializes pacing across workers: two workers asking
    /// for the same family get consecutive slots, not the same one.
    fn reserve_slot(&self, family: Family) -> Instant {
        let base_interval = Duration::from_secs_f64(1.0 / self.rate_for(family));
        let jitter = rand::thread_rng().gen_range(-JITTER_FRAC..=JITTER_FRAC);

        let mut states = self.states.lock();
        let state = states.entry(family).or_insert_with(EndpointHealth::new);
        let now = Instant::now();

        let mut dispatch_at = match state.next_dispatch {
            // First dispatch to a family goes immediately.
            None => now,
            Some(prev) => {
                let interval = wait_interval(
                    base_interval,
                    jitter,
                    state.health_factor,
                    state.consecutive_errors,
                );
                (prev + interval).max(now)
            }
        };

        if let Some(hint) = state.retry_after_until.take() {
            dispatch_at = dispatch_at.max(hint);
        }

        state.next_dispatch = Some(dispatch_at);
        dispatch_at
    }

    /// Record the outcome of a dispatched call.
    pub fn record(&self, family: Family, outcome: FetchOutcome) {
        let mut states = self.states.lock();
        let state = states.entry(family).or_insert_with(EndpointHealth::new);

        match outcome {
            FetchOutcome::Ok => {
                state.consecutive_errors = 0;
                state.health_factor = (state.health_factor * HEALTH_DECAY).max(HEALTH_MIN);
                state.push_outcome(false);
            }
            o if o.is_endpoint_failure() => {
                state.consecutive_errors = state.consecutive_errors.saturating_add(1);
                state.health_factor = (state.health_factor + HEALTH_INCREASE).min(HEALTH_MAX);
                state.push_outcome(true);
                tracing::debug!(
                    family = %family,
                    outcome = o.tag(),
                    consecutive_errors = state.consecutive_errors,
                    health_factor = state.health_factor,
                    "endpoint failure recorded"
                );
            }
            // Permanent: the page is dead, not the endpoint.
            _ => {
                state.push_outcome(true);
            }
        }
    }

    /// Honor an upstream `Retry-After` hint for the family's next dispatch,
    /// plus a small random jitter so synchronized clients fan out.
    pub fn record_retry_after(&self, family: Family, hint: Duration) {
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=RETRY_AFTER_JITTER_MS));
        let until = Instant::now() + hint + jitter;
        let mut states = self.states.lock();
        let state = states.entry(family).or_insert_with(EndpointHealth::new);
        state.retry_after_until = Some(match state.retry_after_until {
            Some(existing) => existing.max(until),
            None => until,
        });
        tracing::info!(
            family = %family,
            hint_secs = hint.as_secs_f64(),
            "honoring upstream Retry-After hint"
        );
    }

    /// Diagnostic snapshot of every family touched so far.
    pub fn snapshot(&self) -> Vec<EndpointHealthSnapshot> {
        let states = self.states.lock();
        let mut out: Vec<EndpointHealthSnapshot> = states
            .iter()
            .map(|(family, s)| EndpointHealthSnapshot {
                family: *family,
                consecutive_errors: s.consecutive_errors,
                health_factor: s.health_factor,
                error_rate: s.error_rate(),
                effective_rate: self.rate_for(*family) / s.health_factor,
            })
            .collect();
        out.sort_by_key(|s| s.family.index());
        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
