//! Committee-side families: committees, hearings, meetings, prints,
//! reports.

use chrono::NaiveDate;

use cm_domain::record::CanonicalRecord;

use super::build;
use crate::util::{Extras, Raw};
use crate::Rejection;

/// Committees carry no congress in the list response; the schema mandates
/// one, so it defaults.
const DEFAULT_CONGRESS: u32 = 1;

pub(crate) fn committee(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["name", "chamber", "systemCode", "updateDate"])?;

    let congress = raw.u32("congress").unwrap_or(DEFAULT_CONGRESS);
    let chamber = raw.req_chamber("chamber")?;
    let system_code = raw.req_str("systemCode")?.to_lowercase();
    let update_date = raw.req_date("updateDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_str("name", raw.str("name"))
        .put_str("chamber", Some(chamber.clone()))
        .put_str("committee_type", raw.str("committeeTypeCode"))
        .put_str("system_code", Some(system_code.clone()))
        .put_clean("parent_committee", raw.value("parent"))
        .put_clean("subcommittees", raw.value("subcommittees"));

    let id = format!("{congress}-{chamber}-{system_code}");
    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn hearing(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "chamber", "jacketNumber", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let chamber = raw.req_chamber("chamber")?;
    let jacket = raw.req_str("jacketNumber")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let committee_code = raw
        .nested("committee")
        .and_then(|c| c.str("systemCode"))
        .map(|c| c.to_lowercase());
    let event_date = raw.date("date", min_date)?;

    // Prefer the committee/event key when the upstream shape carries it;
    // the jacket number is the deterministic fallback.
    let id = match (&committee_code, event_date) {
        (Some(code), Some(date)) => format!("{congress}-{chamber}-{code}-{date}"),
        _ => format!("{congress}-{chamber}-{jacket}"),
    };

    let mut extras = Extras::new();
    extras
        .put_str("chamber", Some(chamber))
        .put_str("jacket_number", Some(jacket))
        .put_clean("committee", raw.value("committee"))
        .put_date("date", event_date)
        .put_str("time", raw.str("time"))
        .put_clean("location", raw.value("location"))
        .put_str("title", raw.str("title"))
        .put_clean("witnesses", raw.value("witnesses"))
        .put_u32("part", raw.u32("part"));

    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn committee_meeting(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "chamber", "eventId", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let chamber = raw.req_chamber("chamber")?;
    let event_id = raw.req_str("eventId")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_str("chamber", Some(chamber.clone()))
        .put_str("event_id", Some(event_id.clone()))
        .put_str("meeting_type", raw.str("type"));

    let id = format!("{congress}-{chamber}-{event_id}");
    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn committee_print(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "chamber", "jacketNumber", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let chamber = raw.req_chamber("chamber")?;
    let jacket = raw.req_str("jacketNumber")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_str("chamber", Some(chamber.clone()))
        .put_str("jacket_number", Some(jacket.clone()));

    let id = format!("{congress}-{chamber}-{jacket}");
    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn committee_report(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "type", "number", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let report_type = raw.req_str("type")?.to_lowercase();
    let number = raw.req_str("number")?;
    let update_date = raw.req_date("updateDate", min_date)?;
    let part = raw.u32("part");

    let id = match part {
        Some(part) if part > 1 => format!("{congress}-{report_type}-{number}-{part}"),
        _ => format!("{congress}-{report_type}-{number}"),
    };

    let mut extras = Extras::new();
    extras
        .put_str("report_type", Some(report_type))
        .put_str("report_number", Some(number))
        .put_str("citation", raw.str("citation"))
        .put_str("chamber", raw.chamber("chamber")?)
        .put_u32("part", part);

    Ok(build(raw, id, congress, update_date, extras))
}

#[cfg(test)]
mod tests {
    use crate::{normalize, RejectReason};
    use chrono::NaiveDate;
    use cm_domain::family::Family;
    use serde_json::json;

    fn min() -> NaiveDate {
        "1789-03-04".parse().unwrap()
    }

    #[test]
    fn committee_defaults_congress_and_builds_id() {
        let raw = json!({
            "name": "Committee on the Judiciary",
            "chamber": "House",
            "systemCode": "hsju00",
            "committeeTypeCode": "Standing",
            "updateDate": "2024-01-10",
            "subcommittees": [{"name": "Subcommittee on Courts", "systemCode": "hsju03"}]
        });
        let record = normalize(Family::Committee, &raw, min()).unwrap();
        assert_eq!(record.id, "1-house-hsju00");
        assert_eq!(record.congress, 1);
        assert_eq!(record.extras["chamber"], json!("house"));
        assert_eq!(record.extras["system_code"], json!("hsju00"));
    }

    #[test]
    fn committee_with_invalid_chamber_is_rejected() {
        let raw = json!({
            "name": "Imaginary Committee",
            "chamber": "Plenary",
            "systemCode": "xx00",
            "updateDate": "2024-01-10"
        });
        let err = normalize(Family::Committee, &raw, min()).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::InvalidChamber {
                value: "Plenary".into()
            }
        );
    }

    #[test]
    fn hearing_prefers_committee_and_date_key() {
        let raw = json!({
            "congress": 118,
            "chamber": "Senate",
            "jacketNumber": 54021,
            "date": "2024-03-14",
            "committee": {"name": "Armed Services", "systemCode": "SSAS00"},
            "title": "Posture hearing",
            "updateDate": "2024-03-15"
        });
        let record = normalize(Family::Hearing, &raw, min()).unwrap();
        assert_eq!(record.id, "118-senate-ssas00-2024-03-14");
        assert_eq!(record.extras["jacket_number"], json!("54021"));
    }

    #[test]
    fn hearing_falls_back_to_jacket_number() {
        let raw = json!({
            "congress": 118,
            "chamber": "Senate",
            "jacketNumber": 54021,
            "updateDate": "2024-03-15"
        });
        let record = normalize(Family::Hearing, &raw, min()).unwrap();
        assert_eq!(record.id, "118-senate-54021");
    }

    #[test]
    fn committee_report_part_number_extends_id() {
        let raw = json!({
            "congress": 117,
            "type": "HRPT",
            "number": "617",
            "part": 2,
            "citation": "H. Rept. 117-617, Part 2",
            "chamber": "House",
            "updateDate": "2022-12-22"
        });
        let record = normalize(Family::CommitteeReport, &raw, min()).unwrap();
        assert_eq!(record.id, "117-hrpt-617-2");
    }

    #[test]
    fn committee_meeting_requires_event_id() {
        let raw = json!({
            "congress": 118,
            "chamber": "House",
            "updateDate": "2024-02-02"
        });
        let err = normalize(Family::CommitteeMeeting, &raw, min()).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::MissingFields(vec!["eventId".into()])
        );
    }

    #[test]
    fn committee_print_id_uses_jacket() {
        let raw = json!({
            "congress": 118,
            "chamber": "House",
            "jacketNumber": 55197,
            "updateDate": "2024-02-02"
        });
        let record = normalize(Family::CommitteePrint, &raw, min()).unwrap();
        assert_eq!(record.id, "118-house-55197");
    }
}
