//! Congressional-record families. The classic congressional-record
//! envelope uses capitalized keys; the daily and bound variants use the
//! modern camelCase shape.

use chrono::NaiveDate;

use cm_domain::record::CanonicalRecord;

use super::build;
use crate::util::{Extras, Raw};
use crate::Rejection;

pub(crate) fn congressional_record(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["Congress", "Volume", "Issue", "PublishDate"])?;

    let congress = raw.req_u32("Congress")?;
    let volume = raw.req_str("Volume")?;
    let issue = raw.req_str("Issue")?;
    let publish_date = raw.req_date("PublishDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_str("volume", Some(volume.clone()))
        .put_str("issue", Some(issue.clone()))
        .put_str("session", raw.str("Session"))
        .put_date("publish_date", Some(publish_date))
        .put_u32("record_id", raw.u32("Id"))
        .put_clean("links", raw.value("Links"));

    let id = format!("{congress}-cr-{volume}-{issue}");
    Ok(build(raw, id, congress, publish_date, extras))
}

pub(crate) fn daily_congressional_record(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "volumeNumber", "issueNumber", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let volume = raw.req_str("volumeNumber")?;
    let issue = raw.req_str("issueNumber")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_str("volume_number", Some(volume.clone()))
        .put_str("issue_number", Some(issue.clone()))
        .put_str("session_number", raw.str("sessionNumber"))
        .put_date("issue_date", raw.date("issueDate", min_date)?);

    let id = format!("{congress}-dcr-{volume}-{issue}");
    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn bound_congressional_record(
    raw: &Raw<'_>,
    min_date: NaiveDate,
) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "date", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let date = raw.req_date("date", min_date)?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_date("date", Some(date))
        .put_str("volume_number", raw.str("volumeNumber"))
        .put_str("session_number", raw.str("sessionNumber"));

    let id = format!("{congress}-bcr-{date}");
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
    fn congressional_record_capitalized_keys() {
        let raw = json!({
            "Congress": "118",
            "Id": 26561,
            "Issue": "15",
            "Volume": "170",
            "Session": "2",
            "PublishDate": "2024-01-25",
            "Links": {"Digest": {"Label": "Daily Digest", "PDF": [{"Url": "https://example.gov/d.pdf"}]}}
        });
        let record = normalize(Family::CongressionalRecord, &raw, min()).unwrap();
        assert_eq!(record.id, "118-cr-170-15");
        assert_eq!(record.update_date.to_string(), "2024-01-25");
        assert_eq!(record.extras["record_id"], json!(26561));
    }

    #[test]
    fn daily_record_id_and_fields() {
        let raw = json!({
            "congress": 118,
            "volumeNumber": 170,
            "issueNumber": "15",
            "sessionNumber": 2,
            "issueDate": "2024-01-25T05:00:00Z",
            "updateDate": "2024-01-26"
        });
        let record = normalize(Family::DailyCongressionalRecord, &raw, min()).unwrap();
        assert_eq!(record.id, "118-dcr-170-15");
        assert_eq!(record.extras["issue_date"], json!("2024-01-25"));
    }

    #[test]
    fn bound_record_is_keyed_by_date() {
        let raw = json!({
            "congress": 117,
            "date": "2022-03-01",
            "volumeNumber": "168",
            "sessionNumber": "2",
            "updateDate": "2023-06-01"
        });
        let record = normalize(Family::BoundCongressionalRecord, &raw, min()).unwrap();
        assert_eq!(record.id, "117-bcr-2022-03-01");
    }

    #[test]
    fn bound_record_invalid_date_rejects() {
        let raw = json!({
            "congress": 117,
            "date": "2022-02-30",
            "updateDate": "2023-06-01"
        });
        let err = normalize(Family::BoundCongressionalRecord, &raw, min()).unwrap_err();
        assert!(matches!(err.reason, RejectReason::InvalidDate { .. }));
    }
}
