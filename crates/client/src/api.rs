//! Congress.gov v3 list-endpoint client.
//!
//! Implements [`PageFetch`] over reqwest. Every family maps to one GET list
//! endpoint taking `fromDateTime`, `toDateTime`, `limit`, `offset`. The
//! client classifies each response into the outcome tags the governor and
//! traversal engine consume; it never retries on its own.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use cm_domain::config::{ApiConfig, TimeoutConfig};
use cm_domain::error::Result;
use cm_domain::family::Family;
use cm_domain::window::DateWindow;

use crate::fetch::{Page, PageError, PageFetch, PageResponse};
use crate::outcome::{classify_status, parse_retry_after, FetchOutcome};
use crate::util::{from_reqwest, resolve_api_key};

/// A configured Congress.gov API client.
///
/// Connect timeouts are a client-level property in reqwest, so one inner
/// client is built per distinct connect timeout; read timeouts are applied
/// per request.
pub struct CongressApi {
    base_url: String,
    api_key: String,
    default_client: reqwest::Client,
    family_clients: HashMap<Family, reqwest::Client>,
    read_timeouts: HashMap<Family, Duration>,
}

impl CongressApi {
    /// Build the client. Fails with an auth error when `CONGRESS_API_KEY`
    /// is absent from the environment.
    pub fn from_config(cfg: &ApiConfig) -> Result<Self> {
        let api_key = resolve_api_key()?;

        let default_client = build_client(TimeoutConfig::default().connect)?;

        let mut family_clients = HashMap::new();
        let mut read_timeouts = HashMap::new();
        for (family, timeouts) in &cfg.timeout_config {
            family_clients.insert(*family, build_client(timeouts.connect)?);
            read_timeouts.insert(*family, Duration::from_secs_f64(timeouts.read));
        }

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_client,
            family_clients,
            read_timeouts,
        })
    }

    fn client_for(&self, family: Family) -> &reqwest::Client {
        self.family_clients.get(&family).unwrap_or(&self.default_client)
    }

    fn read_timeout_for(&self, family: Family) -> Duration {
        self.read_timeouts.get(&family).copied().unwrap_or_else(|| {
            Duration::from_secs_f64(TimeoutConfig::default().read)
        })
    }

    fn list_url(&self, family: Family) -> String {
        format!("{}/{}", self.base_url, family.endpoint_path())
    }
}

fn build_client(connect_secs: f64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs_f64(connect_secs))
        .build()
        .map_err(from_reqwest)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response envelope handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Upstream key of the record list in each family's envelope.
fn list_key(family: Family) -> &'static str {
    match family {
        Family::Bill => "bills",
        Family::Amendment => "amendments",
        Family::Committee => "committees",
        Family::Hearing => "hearings",
        Family::Nomination => "nominations",
        Family::Treaty => "treaties",
        Family::CommitteeReport => "reports",
        Family::CommitteePrint => "committeePrints",
        Family::CommitteeMeeting => "committeeMeetings",
        Family::CongressionalRecord => "Results",
        Family::DailyCongressionalRecord => "dailyCongressionalRecord",
        Family::BoundCongressionalRecord => "boundCongressionalRecord",
        Family::HouseCommunication => "houseCommunications",
        Family::HouseRequirement => "houseRequirements",
        Family::SenateCommunication => "senateCommunications",
        Family::Member => "members",
        Family::Summary => "summaries",
        Family::Congress => "congresses",
    }
}

/// Pull the record array out of a list-response body.
///
/// The congressional-record envelope nests its list one level deeper than
/// every other family (`Results.Issues`).
fn extract_records(family: Family, body: &Value) -> Option<Vec<Value>> {
    let node = body.get(list_key(family))?;
    let arr = match family {
        Family::CongressionalRecord => node.get("Issues")?.as_array()?,
        _ => node.as_array()?,
    };
    Some(arr.to_vec())
}

fn has_next_page(body: &Value) -> bool {
    body.get("pagination")
        .and_then(|p| p.get("next"))
        .and_then(|n| n.as_str())
        .is_some()
}

/// Interpret a 200 body. A present-but-empty list and an absent list key
/// alongside a pagination block both mean "no records in this window";
/// anything else unparseable is a malformed page.
fn parse_list_body(family: Family, body: Value, offset: u64) -> PageResponse {
    if let Some(records) = extract_records(family, &body) {
        let has_more = has_next_page(&body);
        return PageResponse::Page(Page { records, has_more });
    }
    if body.get("pagination").is_some() {
        return PageResponse::Page(Page {
            records: Vec::new(),
            has_more: false,
        });
    }
    PageResponse::Failed(PageError {
        outcome: FetchOutcome::Permanent,
        status: Some(200),
        retry_after: None,
        message: format!("malformed {family} page at offset {offset}: missing record list"),
    })
}

#[async_trait::async_trait]
impl PageFetch for CongressApi {
    async fn fetch_page(
        &self,
        family: Family,
        window: DateWindow,
        offset: u64,
        limit: u64,
    ) -> PageResponse {
        let url = self.list_url(family);
        let request = self
            .client_for(family)
            .get(&url)
            .timeout(self.read_timeout_for(family))
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("format", "json".to_string()),
                ("fromDateTime", format!("{}T00:00:00Z", window.from)),
                ("toDateTime", format!("{}T00:00:00Z", window.to)),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ]);

        tracing::debug!(family = %family, window = %window, offset, limit, "fetching page");

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let outcome = if e.is_timeout() {
                    FetchOutcome::Timeout
                } else {
                    FetchOutcome::Transient
                };
                return PageResponse::Failed(PageError {
                    outcome,
                    status: None,
                    retry_after: None,
                    message: e.to_string(),
                });
            }
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        match classify_status(status) {
            FetchOutcome::Ok => {}
            outcome => {
                let message = response.text().await.unwrap_or_default();
                return PageResponse::Failed(PageError {
                    outcome,
                    status: Some(status),
                    retry_after,
                    message: format!("HTTP {status}: {message}"),
                });
            }
        }

        match response.json::<Value>().await {
            Ok(body) => parse_list_body(family, body, offset),
            Err(e) => PageResponse::Failed(PageError {
                outcome: FetchOutcome::Permanent,
                status: Some(status),
                retry_after: None,
                message: format!("malformed {family} page at offset {offset}: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_flat_family_lists() {
        let body = json!({
            "bills": [{"number": "100"}, {"number": "101"}],
            "pagination": {"count": 2}
        });
        let records = extract_records(Family::Bill, &body).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!has_next_page(&body));
    }

    #[test]
    fn extracts_nested_congressional_record_issues() {
        let body = json!({
            "Results": {"Issues": [{"Id": 1}]},
            "pagination": {"count": 1}
        });
        let records = extract_records(Family::CongressionalRecord, &body).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn pagination_next_signals_more() {
        let body = json!({
            "amendments": [],
            "pagination": {"count": 500, "next": "https://api.congress.gov/v3/amendment?offset=250"}
        });
        assert!(has_next_page(&body));
    }

    #[test]
    fn missing_list_with_pagination_is_empty_page() {
        let body = json!({"pagination": {"count": 0}});
        match parse_list_body(Family::Treaty, body, 0) {
            PageResponse::Page(p) => {
                assert!(p.records.is_empty());
                assert!(!p.has_more);
            }
            PageResponse::Failed(_) => panic!("expected empty page"),
        }
    }

    #[test]
    fn missing_list_without_pagination_is_malformed() {
        let body = json!({"error": "upstream glitch"});
        match parse_list_body(Family::Treaty, body, 250) {
            PageResponse::Failed(e) => {
                assert_eq!(e.outcome, FetchOutcome::Permanent);
                assert!(e.message.contains("offset 250"));
            }
            PageResponse::Page(_) => panic!("expected malformed page"),
        }
    }
}
