//! Lock-free run metrics shared by every worker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use cm_domain::family::Family;
use cm_domain::report::{FamilyCounters, WindowCounters};

#[derive(Default)]
struct FamilyCells {
    requested: AtomicU64,
    received: AtomicU64,
    validated: AtomicU64,
    stored: AtomicU64,
    duplicates_skipped: AtomicU64,
    failed_validation: AtomicU64,
    failed_store: AtomicU64,
    retries: AtomicU64,
    rate_limit_waits: AtomicU64,
}

impl FamilyCells {
    fn snapshot(&self) -> FamilyCounters {
        FamilyCounters {
            requested: self.requested.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            validated: self.validated.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            failed_validation: self.failed_validation.load(Ordering::Relaxed),
            failed_store: self.failed_store.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            rate_limit_waits: self.rate_limit_waits.load(Ordering::Relaxed),
        }
    }

    fn is_untouched(&self) -> bool {
        self.snapshot() == FamilyCounters::default()
    }
}

/// Per-family atomic counters plus run-wide tallies. One instance per run,
/// shared via `Arc`; every mutation is a relaxed atomic add.
pub struct RunMetrics {
    families: [FamilyCells; 18],
    windows_completed: AtomicU64,
    windows_partial: AtomicU64,
    windows_failed: AtomicU64,
    dates_completed: AtomicU64,
}

/// Aggregated view used to build the run report.
pub struct MetricsSnapshot {
    pub totals: FamilyCounters,
    pub families: BTreeMap<String, FamilyCounters>,
    pub windows: WindowCounters,
    pub dates_completed: u64,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            families: Default::default(),
            windows_completed: AtomicU64::new(0),
            windows_partial: AtomicU64::new(0),
            windows_failed: AtomicU64::new(0),
            dates_completed: AtomicU64::new(0),
        }
    }

    fn cells(&self, family: Family) -> &FamilyCells {
        &self.families[family.index()]
    }

    pub fn add_requested(&self, family: Family, n: u64) {
        self.cells(family).requested.fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_received(&self, family: Family, n: u64) {
        self.cells(family).received.fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_validated(&self, family: Family, n: u64) {
        self.cells(family).validated.fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_stored(&self, family: Family, n: u64) {
        self.cells(family).stored.fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_duplicates_skipped(&self, family: Family, n: u64) {
        self.cells(family)
            .duplicates_skipped
            .fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_failed_validation(&self, family: Family, n: u64) {
        self.cells(family)
            .failed_validation
            .fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_failed_store(&self, family: Family, n: u64) {
        self.cells(family)
            .failed_store
            .fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_retries(&self, family: Family, n: u64) {
        self.cells(family).retries.fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_rate_limit_waits(&self, family: Family, n: u64) {
        self.cells(family)
            .rate_limit_waits
            .fetch_add(n, Ordering::Relaxed);
    }

    pub fn window_completed(&self) {
        self.windows_completed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn window_partial(&self) {
        self.windows_partial.fetch_add(1, Ordering::Relaxed);
    }
    pub fn window_failed(&self) {
        self.windows_failed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn date_completed(&self) {
        self.dates_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot touched families plus totals. Untouched families are
    /// omitted from the per-family breakdown.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut totals = FamilyCounters::default();
        let mut families = BTreeMap::new();

        for family in Family::ALL {
            let cells = self.cells(family);
            if cells.is_untouched() {
                continue;
            }
            let counters = cells.snapshot();
            totals.absorb(&counters);
            families.insert(family.tag().to_string(), counters);
        }

        MetricsSnapshot {
            totals,
            families,
            windows: WindowCounters {
                completed: self.windows_completed.load(Ordering::Relaxed),
                partial: self.windows_partial.load(Ordering::Relaxed),
                failed: self.windows_failed.load(Ordering::Relaxed),
            },
            dates_completed: self.dates_completed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_aggregates_touched_families_only() {
        let metrics = RunMetrics::new();
        metrics.add_stored(Family::Bill, 6);
        metrics.add_duplicates_skipped(Family::Bill, 1);
        metrics.add_stored(Family::Treaty, 2);

        let snap = metrics.snapshot();
        assert_eq!(snap.totals.stored, 8);
        assert_eq!(snap.totals.duplicates_skipped, 1);
        assert_eq!(snap.families.len(), 2);
        assert_eq!(snap.families["bill"].stored, 6);
        assert!(!snap.families.contains_key("member"));
    }

    #[test]
    fn window_and_date_tallies() {
        let metrics = RunMetrics::new();
        metrics.window_completed();
        metrics.window_completed();
        metrics.window_partial();
        metrics.date_completed();

        let snap = metrics.snapshot();
        assert_eq!(snap.windows.completed, 2);
        assert_eq!(snap.windows.partial, 1);
        assert_eq!(snap.windows.failed, 0);
        assert_eq!(snap.dates_completed, 1);
    }
}
