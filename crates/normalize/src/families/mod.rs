//! Per-family extraction catalogue.
//!
//! Each extractor maps its family's upstream keys onto canonical
//! snake_case attributes, synthesizes the deterministic id, and enforces
//! the family's required fields. Families with closely related shapes
//! share a module.

mod bills;
mod committees;
mod communications;
mod misc;
mod people;
mod records;

use chrono::NaiveDate;
use serde_json::Value;

use cm_domain::family::Family;
use cm_domain::record::{CanonicalRecord, SCHEMA_VERSION};

use crate::util::{Extras, Raw};
use crate::Rejection;

/// Dispatch one raw record to its family extractor.
pub(crate) fn extract(
    family: Family,
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    match family {
        Family::Bill => bills::bill(raw, min_date),
        Family::Amendment => bills::amendment(raw, min_date),
        Family::Summary => bills::summary(raw, min_date),
        Family::Committee => committees::committee(raw, min_date),
        Family::Hearing => committees::hearing(raw, min_date),
        Family::CommitteeMeeting => committees::committee_meeting(raw, min_date),
        Family::CommitteePrint => committees::committee_print(raw, min_date),
        Family::CommitteeReport => committees::committee_report(raw, min_date),
        Family::CongressionalRecord => records::congressional_record(raw, min_date),
        Family::DailyCongressionalRecord => records::daily_congressional_record(raw, min_date),
        Family::BoundCongressionalRecord => records::bound_congressional_record(raw, min_date),
        Family::HouseCommunication => communications::house_communication(raw, min_date),
        Family::HouseRequirement => communications::house_requirement(raw, min_date),
        Family::SenateCommunication => communications::senate_communication(raw, min_date),
        Family::Member => people::member(raw, min_date),
        Family::Nomination => people::nomination(raw, min_date),
        Family::Treaty => misc::treaty(raw, min_date),
        Family::Congress => misc::congress(raw, min_date),
    }
}

/// Assemble the canonical record. The schema version defaults to the
/// current generation when upstream carries none; an HTTPS resource URL is
/// kept when present.
pub(super) fn build(
    raw: &Raw<'_>,
    id: String,
    congress: u32,
    update_date: NaiveDate,
    extras: Extras,
) -> CanonicalRecord {
    let url = raw.str("url").filter(|u| u.starts_with("https://"));
    CanonicalRecord {
        id,
        family: raw.family,
        congress,
        update_date,
        version: raw.u32("version").unwrap_or(SCHEMA_VERSION),
        url,
        extras: extras.into_map(),
    }
}

/// Normalize an upstream `latestAction` object into
/// `{action_date, text}`, dropping whatever does not clean up.
pub(super) fn latest_action(raw: &Raw<'_>) -> Option<Value> {
    let action = raw.nested("latestAction")?;
    let mut out = serde_json::Map::new();
    if let Some(date) = action.str("actionDate") {
        out.insert("action_date".into(), Value::String(date));
    }
    if let Some(text) = action.str("text") {
        out.insert("text".into(), Value::String(text));
    }
    (!out.is_empty()).then_some(Value::Object(out))
}
