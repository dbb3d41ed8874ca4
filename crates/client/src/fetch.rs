//! The page-fetch seam between the traversal engine and the HTTP client.
//!
//! The traversal engine drives any [`PageFetch`] implementation: the real
//! Congress.gov client in production, scripted fakes in tests.

use std::time::Duration;

use serde_json::Value;

use cm_domain::family::Family;
use cm_domain::window::DateWindow;

use crate::outcome::FetchOutcome;

/// One successfully fetched page of raw upstream records.
#[derive(Debug, Clone)]
pub struct Page {
    /// Raw records in upstream list order.
    pub records: Vec<Value>,
    /// Whether upstream advertises another page after this one.
    pub has_more: bool,
}

/// One failed page fetch, already classified.
#[derive(Debug, Clone)]
pub struct PageError {
    pub outcome: FetchOutcome,
    pub status: Option<u16>,
    /// Upstream `Retry-After` hint, when present on a rate-limit response.
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl PageError {
    /// Upstream rejected our credentials; the run must abort.
    pub fn is_auth(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

#[derive(Debug, Clone)]
pub enum PageResponse {
    Page(Page),
    Failed(PageError),
}

/// A paginated list endpoint, addressable by (family, window, offset).
#[async_trait::async_trait]
pub trait PageFetch: Send + Sync {
    async fn fetch_page(
        &self,
        family: Family,
        window: DateWindow,
        offset: u64,
        limit: u64,
    ) -> PageResponse;
}
