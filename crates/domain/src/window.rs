//! Date windows and sub-window chunking.
//!
//! A window is half-open: `[from, to)` in whole calendar days. The upstream
//! API takes `fromDateTime`/`toDateTime` instants, and a half-open day range
//! maps onto those without double-counting the boundary midnight.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// The earliest date the corpus can contain (First Congress convened).
pub const CORPUS_FLOOR: &str = "1789-03-04";

/// A half-open range of calendar days `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// A window covering exactly one day.
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            from: day,
            to: day + Duration::days(1),
        }
    }

    /// Number of days covered. Zero when `from >= to`.
    pub fn num_days(&self) -> i64 {
        (self.to - self.from).num_days().max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    /// Iterate the days covered, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut current = self.from;
        let end = self.to;
        std::iter::from_fn(move || {
            if current >= end {
                return None;
            }
            let day = current;
            current += Duration::days(1);
            Some(day)
        })
    }

    /// Clamp the window's start so it never reaches before `floor`.
    pub fn clamp_start(&self, floor: NaiveDate) -> DateWindow {
        DateWindow {
            from: self.from.max(floor),
            to: self.to,
        }
    }

    /// Split into contiguous sub-windows of at most `max_days` days each,
    /// oldest first. An empty window yields nothing.
    pub fn split(&self, max_days: i64) -> Vec<DateWindow> {
        let max_days = max_days.max(1);
        let mut out = Vec::new();
        let mut start = self.from;
        while start < self.to {
            let end = (start + Duration::days(max_days)).min(self.to);
            out.push(DateWindow {
                from: start,
                to: end,
            });
            start = end;
        }
        out
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}
