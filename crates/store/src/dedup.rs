//! The run-scoped processed-ID set.
//!
//! Holds only identifiers, never values. Created at run start, cleared at
//! the configured boundary, destroyed at run end. A reset is the only way
//! the set shrinks; an advisory memory threshold forces one early.

use std::collections::HashSet;

use parking_lot::Mutex;

use cm_domain::config::{DedupConfig, ResetFrequency};

/// Estimated fixed per-entry overhead on top of the id bytes.
const ENTRY_OVERHEAD_BYTES: u64 = 48;

/// Boundary events at which the set may reset, depending on config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetBoundary {
    /// A worker is about to start a sub-window.
    RangeStart,
    /// A worker is about to start one date inside a sub-window.
    DateStart,
}

#[derive(Default)]
struct Inner {
    ids: HashSet<String>,
    approx_bytes: u64,
    resets: u64,
}

/// Mutex-protected identifier registry shared by every worker in a run.
pub struct ProcessedIds {
    enabled: bool,
    reset_frequency: ResetFrequency,
    threshold_bytes: u64,
    inner: Mutex<Inner>,
}

impl ProcessedIds {
    pub fn new(cfg: &DedupConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            reset_frequency: cfg.reset_frequency,
            threshold_bytes: cfg.memory_threshold_mb.saturating_mul(1024 * 1024),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Whether `id` has already been stored this session. Always `false`
    /// when deduplication is disabled.
    pub fn contains(&self, id: &str) -> bool {
        self.enabled && self.inner.lock().ids.contains(id)
    }

    /// Register ids whose writes succeeded. Triggers a forced reset when
    /// the advisory memory threshold is crossed.
    pub fn record_stored<I>(&self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        for id in ids {
            let weight = id.len() as u64 + ENTRY_OVERHEAD_BYTES;
            if inner.ids.insert(id) {
                inner.approx_bytes += weight;
            }
        }
        if inner.approx_bytes > self.threshold_bytes {
            tracing::warn!(
                ids = inner.ids.len(),
                approx_bytes = inner.approx_bytes,
                threshold_bytes = self.threshold_bytes,
                "processed-ID set exceeded memory threshold, forcing reset"
            );
            Self::clear(&mut inner);
        }
    }

    /// Reset the set if the configured frequency matches this boundary.
    pub fn maybe_reset(&self, boundary: ResetBoundary) {
        if !self.enabled {
            return;
        }
        let should = match (self.reset_frequency, boundary) {
            (ResetFrequency::PerDate, ResetBoundary::DateStart) => true,
            // A range start is also a date boundary for its first date;
            // per_date resets there too so overlapping ranges converge.
            (ResetFrequency::PerDate, ResetBoundary::RangeStart) => true,
            (ResetFrequency::PerRange, ResetBoundary::RangeStart) => true,
            (ResetFrequency::PerRange, ResetBoundary::DateStart) => false,
            (ResetFrequency::PerSession, _) => false,
        };
        if should {
            let mut inner = self.inner.lock();
            if !inner.ids.is_empty() {
                tracing::debug!(ids = inner.ids.len(), boundary = ?boundary, "dedup set reset");
            }
            Self::clear(&mut inner);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of resets performed so far, forced ones included.
    pub fn resets(&self) -> u64 {
        self.inner.lock().resets
    }

    fn clear(inner: &mut Inner) {
        inner.ids.clear();
        inner.approx_bytes = 0;
        inner.resets += 1;
    }
}
