//! Executive-communication families and House requirements.

use chrono::NaiveDate;

use cm_domain::record::CanonicalRecord;

use super::build;
use crate::util::{Extras, Raw};
use crate::{RejectReason, Rejection};

pub(crate) fn house_communication(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["chamber", "number", "updateDate", "communicationType.code"])?;
    communication(raw, min_date, "congressNumber")
}

pub(crate) fn senate_communication(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["chamber", "number", "updateDate", "communicationType.code"])?;
    communication(raw, min_date, "congress")
}

/// Shared house/senate communication shape. The two endpoints disagree on
/// the congress key; `congress_key` names the preferred one.
fn communication(
    raw: &Raw<'_>,
    min_date: NaiveDate,
    congress_key: &str,
) -> Result<CanonicalRecord, Rejection> {
    let congress = raw
        .u32(congress_key)
        .or_else(|| raw.u32("congress"))
        .or_else(|| raw.u32("congressNumber"))
        .ok_or_else(|| Rejection {
            family: raw.family,
            reason: RejectReason::MissingFields(vec![congress_key.to_string()]),
        })?;
    let chamber = raw.req_chamber("chamber")?;
    let number = raw.req_str("number")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let comm_type = raw.nested("communicationType").ok_or_else(|| Rejection {
        family: raw.family,
        reason: RejectReason::MissingFields(vec!["communicationType".into()]),
    })?;
    let code = comm_type.req_str("code")?.to_lowercase();

    let mut extras = Extras::new();
    extras
        .put_str("chamber", Some(chamber.clone()))
        .put_str("communication_number", Some(number.clone()))
        .put_clean("communication_type", raw.value("communicationType"))
        .put_str("report_nature", raw.str("reportNature"))
        .put_str("legal_authority", raw.str("legalAuthority"));

    let id = format!("{congress}-{chamber}-{code}-{number}");
    Ok(build(raw, id, congress, update_date, extras))
}

/// House requirements have no congress; the schema mandates one, so it
/// defaults.
pub(crate) fn house_requirement(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["number", "updateDate"])?;

    let number = raw.req_str("number")?;
    let update_date = raw.req_date("updateDate", min_date)?;
    let congress = raw.u32("congress").unwrap_or(1);

    let mut extras = Extras::new();
    extras
        .put_str("requirement_number", Some(number.clone()))
        .put_str("nature", raw.str("nature"))
        .put_str("frequency", raw.str("frequency"))
        .put_clean("parent_agency", raw.value("parentAgency"));

    let id = format!("hreq-{number}");
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
    fn house_communication_id_carries_chamber_and_code() {
        let raw = json!({
            "chamber": "House",
            "communicationType": {"code": "EC", "name": "Executive Communication"},
            "congressNumber": 118,
            "number": "3324",
            "reportNature": "A report on something.",
            "updateDate": "2024-01-12"
        });
        let record = normalize(Family::HouseCommunication, &raw, min()).unwrap();
        assert_eq!(record.id, "118-house-ec-3324");
        assert_eq!(record.extras["communication_number"], json!("3324"));
    }

    #[test]
    fn senate_communication_same_code_does_not_collide() {
        let raw = json!({
            "chamber": "Senate",
            "communicationType": {"code": "EC", "name": "Executive Communication"},
            "congress": 118,
            "number": "3324",
            "updateDate": "2024-01-12"
        });
        let record = normalize(Family::SenateCommunication, &raw, min()).unwrap();
        assert_eq!(record.id, "118-senate-ec-3324");
    }

    #[test]
    fn communication_without_type_code_rejects() {
        let raw = json!({
            "chamber": "House",
            "congressNumber": 118,
            "number": "10",
            "updateDate": "2024-01-12"
        });
        let err = normalize(Family::HouseCommunication, &raw, min()).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::MissingFields(vec!["communicationType.code".into()])
        );
    }

    #[test]
    fn house_requirement_defaults_congress() {
        let raw = json!({
            "number": 8070,
            "nature": "Quarterly report",
            "updateDate": "2024-01-03",
            "parentAgency": {"name": "Department of Example"}
        });
        let record = normalize(Family::HouseRequirement, &raw, min()).unwrap();
        assert_eq!(record.id, "hreq-8070");
        assert_eq!(record.congress, 1);
    }
}
