//! Validation and normalization of raw upstream records.
//!
//! [`normalize`] is a total, pure function: no I/O, no shared state, safe
//! to call from any worker concurrently. The same raw record always yields
//! a byte-identical canonical record or the same rejection.

pub mod dates;
mod families;
mod util;

use chrono::NaiveDate;
use serde_json::Value;

use cm_domain::family::Family;
use cm_domain::record::CanonicalRecord;

use util::Raw;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rejection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The raw record is not a JSON object.
    NotAnObject,
    /// Required fields absent or empty after trimming.
    MissingFields(Vec<String>),
    /// A date field that is not a valid calendar date at or after the
    /// configured floor.
    InvalidDate { field: String, value: String },
    /// A chamber outside `{house, senate, joint}`.
    InvalidChamber { value: String },
}

/// A rejected record, with enough context for the run report and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub family: Family,
    pub reason: RejectReason,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            RejectReason::NotAnObject => write!(f, "{}: record is not an object", self.family),
            RejectReason::MissingFields(fields) => {
                write!(f, "{}: missing required fields {:?}", self.family, fields)
            }
            RejectReason::InvalidDate { field, value } => {
                write!(f, "{}: field '{field}' has invalid date '{value}'", self.family)
            }
            RejectReason::InvalidChamber { value } => {
                write!(f, "{}: chamber '{value}' not one of house/senate/joint", self.family)
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert one raw upstream record into a canonical record, or reject it.
///
/// `min_date` is the lower bound every normalized date must satisfy
/// (default: 1789-03-04, the First Congress).
pub fn normalize(
    family: Family,
    raw: &Value,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    let raw = Raw::new(family, raw)?;
    families::extract(family, &raw, min_date)
}
