//! Members and nominations.

use chrono::NaiveDate;

use cm_domain::record::CanonicalRecord;

use super::{build, latest_action};
use crate::util::{Extras, Raw};
use crate::Rejection;

/// Members are not congress-scoped upstream; the schema mandates a
/// congress, so it defaults.
pub(crate) fn member(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["bioguideId", "updateDate"])?;

    let bioguide = raw.req_str("bioguideId")?;
    let update_date = raw.req_date("updateDate", min_date)?;
    let congress = raw.u32("congress").unwrap_or(1);

    let mut extras = Extras::new();
    extras
        .put_str("bioguide_id", Some(bioguide.clone()))
        .put_str("name", raw.str("name"))
        .put_str("party", raw.str("partyName"))
        .put_str("state", raw.str("state"))
        .put_u32("district", raw.u32("district"))
        .put_clean("terms", raw.value("terms"))
        .put_clean("depiction", raw.value("depiction"));

    let id = format!("member-{}", bioguide.to_lowercase());
    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn nomination(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "number", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let number = raw.req_str("number")?;
    let update_date = raw.req_date("updateDate", min_date)?;
    let part_number = raw.str("partNumber");

    let id = match &part_number {
        Some(part) => format!("{congress}-pn-{number}-{part}"),
        None => format!("{congress}-pn-{number}"),
    };

    let mut extras = Extras::new();
    extras
        .put_str("nomination_number", Some(number))
        .put_str("part_number", part_number)
        .put_str("citation", raw.str("citation"))
        .put_str("organization", raw.str("organization"))
        .put_str("description", raw.str("description"))
        .put_date("received_date", raw.date("receivedDate", min_date)?)
        .put_clean("nomination_type", raw.value("nominationType"))
        .put_clean("latest_action", latest_action(raw).as_ref());

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
    fn member_id_is_lowercased_bioguide() {
        let raw = json!({
            "bioguideId": "A000360",
            "name": "Alexander, Lamar",
            "partyName": "Republican",
            "state": "Tennessee",
            "updateDate": "2024-01-09",
            "terms": {"item": [{"chamber": "Senate", "startYear": 2003}]}
        });
        let record = normalize(Family::Member, &raw, min()).unwrap();
        assert_eq!(record.id, "member-a000360");
        assert_eq!(record.congress, 1);
        // Original casing is preserved in the attribute.
        assert_eq!(record.extras["bioguide_id"], json!("A000360"));
    }

    #[test]
    fn nomination_part_number_extends_id() {
        let raw = json!({
            "congress": 118,
            "number": "1234",
            "partNumber": "2",
            "citation": "PN1234-2",
            "organization": "The Judiciary",
            "receivedDate": "2023-11-01",
            "updateDate": "2023-11-02",
            "latestAction": {"actionDate": "2023-11-01", "text": "Received in the Senate."}
        });
        let record = normalize(Family::Nomination, &raw, min()).unwrap();
        assert_eq!(record.id, "118-pn-1234-2");
        assert_eq!(record.extras["received_date"], json!("2023-11-01"));
    }

    #[test]
    fn nomination_without_part_has_short_id() {
        let raw = json!({
            "congress": 118,
            "number": "77",
            "updateDate": "2023-11-02"
        });
        let record = normalize(Family::Nomination, &raw, min()).unwrap();
        assert_eq!(record.id, "118-pn-77");
    }

    #[test]
    fn member_without_bioguide_rejects() {
        let raw = json!({"name": "Nobody", "updateDate": "2024-01-09"});
        let err = normalize(Family::Member, &raw, min()).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::MissingFields(vec!["bioguideId".into()])
        );
    }
}
