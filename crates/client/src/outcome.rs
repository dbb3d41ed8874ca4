//! Outcome tags shared between the traversal engine and the rate governor.

use std::time::Duration;

/// Classification of one upstream call. Emitted by the traversal engine,
/// consumed by the governor's health bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Ok,
    /// 5xx, connection reset, DNS failure. Retryable.
    Transient,
    /// HTTP 429 or an upstream quota signal. Retryable with hint.
    RateLimited,
    /// 4xx other than 429, or a malformed body. Not retryable.
    Permanent,
    /// Connect or read deadline exceeded. Retryable.
    Timeout,
}

impl FetchOutcome {
    /// Whether the governor should count this as an endpoint failure.
    ///
    /// `Permanent` means the *page* is dead, not the endpoint, so it does
    /// not inflate backoff.
    pub fn is_endpoint_failure(self) -> bool {
        matches!(
            self,
            FetchOutcome::Transient | FetchOutcome::RateLimited | FetchOutcome::Timeout
        )
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FetchOutcome::Transient | FetchOutcome::RateLimited | FetchOutcome::Timeout
        )
    }

    pub fn tag(self) -> &'static str {
        match self {
            FetchOutcome::Ok => "ok",
            FetchOutcome::Transient => "transient",
            FetchOutcome::RateLimited => "rate_limited",
            FetchOutcome::Permanent => "permanent",
            FetchOutcome::Timeout => "timeout",
        }
    }
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> FetchOutcome {
    match status {
        200..=299 => FetchOutcome::Ok,
        429 => FetchOutcome::RateLimited,
        500..=599 => FetchOutcome::Transient,
        _ => FetchOutcome::Permanent,
    }
}

/// Parse a `Retry-After` header value. Only the delta-seconds form is
/// supported; HTTP-date hints fall back to `None` and the computed backoff.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
