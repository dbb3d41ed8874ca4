//! Run requests and the structured run report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::family::Family;
use crate::window::DateWindow;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run request
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Re-ingest the trailing `lookback` days.
    Incremental,
    /// Re-ingest an explicit date window.
    Refresh,
    /// Ingest everything from the corpus floor to today.
    Bulk,
}

/// One invocation of the ingestion core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub mode: RunMode,
    /// Required for `Refresh`; ignored otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<DateWindow>,
    /// Required for `Incremental` unless the configured default applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<i64>,
    /// Empty means every family.
    #[serde(default)]
    pub families: Vec<Family>,
}

impl RunRequest {
    /// The families this run covers, in stable dispatch order.
    pub fn resolved_families(&self) -> Vec<Family> {
        if self.families.is_empty() {
            return Family::ALL.to_vec();
        }
        let mut out: Vec<Family> = Family::ALL
            .iter()
            .copied()
            .filter(|f| self.families.contains(f))
            .collect();
        out.dedup();
        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run report
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Ok,
    Partial,
    Failed,
    Cancelled,
}

/// Per-family (and aggregate) ingestion counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCounters {
    /// HTTP page requests issued, including retries.
    pub requested: u64,
    /// Raw records received from upstream pages.
    pub received: u64,
    /// Records that passed validation/normalization.
    pub validated: u64,
    /// Records effectively written to the store.
    pub stored: u64,
    /// Records skipped by the processed-ID set or same-batch dedup.
    pub duplicates_skipped: u64,
    /// Records rejected by the validator.
    pub failed_validation: u64,
    /// Records the store permanently rejected.
    pub failed_store: u64,
    /// Page and batch retries performed.
    pub retries: u64,
    /// Waits imposed by upstream rate-limit signals.
    pub rate_limit_waits: u64,
}

impl FamilyCounters {
    pub fn absorb(&mut self, other: &FamilyCounters) {
        self.requested += other.requested;
        self.received += other.received;
        self.validated += other.validated;
        self.stored += other.stored;
        self.duplicates_skipped += other.duplicates_skipped;
        self.failed_validation += other.failed_validation;
        self.failed_store += other.failed_store;
        self.retries += other.retries;
        self.rate_limit_waits += other.rate_limit_waits;
    }
}

/// Sub-window completion tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounters {
    pub completed: u64,
    pub partial: u64,
    pub failed: u64,
}

/// The structured outcome of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub state: TerminalState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub totals: FamilyCounters,
    /// Per-family breakdown keyed by family tag.
    pub families: BTreeMap<String, FamilyCounters>,
    pub windows: WindowCounters,
    /// Dates fully drained and flushed before the run ended.
    pub dates_completed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_families_resolves_to_all() {
        let req = RunRequest {
            mode: RunMode::Incremental,
            window: None,
            lookback_days: Some(7),
            families: vec![],
        };
        assert_eq!(req.resolved_families(), Family::ALL.to_vec());
    }

    #[test]
    fn explicit_families_keep_stable_order() {
        let req = RunRequest {
            mode: RunMode::Refresh,
            window: None,
            lookback_days: None,
            // Deliberately out of dispatch order.
            families: vec![Family::Treaty, Family::Bill, Family::Treaty],
        };
        assert_eq!(
            req.resolved_families(),
            vec![Family::Bill, Family::Treaty]
        );
    }

    #[test]
    fn counters_absorb_adds_fieldwise() {
        let mut a = FamilyCounters {
            stored: 3,
            retries: 1,
            ..Default::default()
        };
        let b = FamilyCounters {
            stored: 2,
            duplicates_skipped: 1,
            ..Default::default()
        };
        a.absorb(&b);
        assert_eq!(a.stored, 5);
        assert_eq!(a.duplicates_skipped, 1);
        assert_eq!(a.retries, 1);
    }

    #[test]
    fn terminal_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TerminalState::Cancelled).unwrap(),
            r#""cancelled""#
        );
    }
}
