//! Bill, amendment, and bill-summary extraction.

use chrono::NaiveDate;
use serde_json::Value;

use cm_domain::record::CanonicalRecord;

use super::{build, latest_action};
use crate::util::{Extras, Raw};
use crate::Rejection;

pub(crate) fn bill(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "type", "number", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let bill_type = raw.req_str("type")?.to_lowercase();
    let number = raw.req_str("number")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_str("bill_type", Some(bill_type.clone()))
        .put_str("bill_number", Some(number.clone()))
        .put_str("title", raw.str("title"))
        .put_str("origin_chamber", raw.chamber("originChamber")?)
        .put_date("introduced_date", raw.date("introducedDate", min_date)?)
        .put_clean("latest_action", latest_action(raw).as_ref())
        .put_clean("sponsors", raw.value("sponsors"))
        .put_clean("committees", raw.value("committees"));

    let id = format!("{congress}-{bill_type}-{number}");
    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn amendment(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congress", "type", "number", "updateDate"])?;

    let congress = raw.req_u32("congress")?;
    let amendment_type = raw.req_str("type")?.to_lowercase();
    let number = raw.req_str("number")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    let mut extras = Extras::new();
    extras
        .put_str("amendment_type", Some(amendment_type.clone()))
        .put_str("amendment_number", Some(number.clone()))
        .put_str("purpose", raw.str("purpose"))
        .put_str("chamber", raw.chamber("chamber")?)
        .put_date("submit_date", raw.date("submittedDate", min_date)?)
        .put_clean("latest_action", latest_action(raw).as_ref())
        .put_clean("associated_bill", associated_bill(raw).as_ref());

    let id = format!("{congress}-{amendment_type}-{number}");
    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn summary(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&[
        "congress",
        "updateDate",
        "actionDate",
        "bill.type",
        "bill.number",
    ])?;

    let congress = raw.req_u32("congress")?;
    let update_date = raw.req_date("updateDate", min_date)?;
    let action_date = raw.req_date("actionDate", min_date)?;

    // Presence of bill.type / bill.number is already guaranteed.
    let bill = raw.nested("bill").ok_or_else(|| Rejection {
        family: raw.family,
        reason: crate::RejectReason::MissingFields(vec!["bill".into()]),
    })?;
    let bill_type = bill.req_str("type")?.to_lowercase();
    let bill_number = bill.req_str("number")?;
    let version_code = raw.str("versionCode");

    let suffix = version_code
        .clone()
        .unwrap_or_else(|| action_date.to_string());
    let id = format!("{congress}-{bill_type}-{bill_number}-sum-{suffix}");

    let mut extras = Extras::new();
    extras
        .put_date("action_date", Some(action_date))
        .put_str("action_desc", raw.str("actionDesc"))
        .put_str("version_code", version_code)
        .put_str("text", raw.str("text"))
        .put_str("current_chamber", raw.chamber("currentChamber")?)
        .put_clean(
            "associated_bill",
            Some(&Value::Object(
                [
                    ("congress".to_string(), Value::from(congress)),
                    ("type".to_string(), Value::String(bill_type)),
                    ("number".to_string(), Value::String(bill_number)),
                ]
                .into_iter()
                .collect(),
            )),
        );

    Ok(build(raw, id, congress, update_date, extras))
}

/// `amendedBill {congress, type, number}` → canonical associated-bill map.
fn associated_bill(raw: &Raw<'_>) -> Option<Value> {
    let bill = raw.nested("amendedBill")?;
    let mut out = serde_json::Map::new();
    if let Some(congress) = bill.u32("congress") {
        out.insert("congress".into(), Value::from(congress));
    }
    if let Some(bill_type) = bill.str("type") {
        out.insert("type".into(), Value::String(bill_type.to_lowercase()));
    }
    if let Some(number) = bill.str("number") {
        out.insert("number".into(), Value::String(number));
    }
    (!out.is_empty()).then_some(Value::Object(out))
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
    fn bill_id_and_attributes() {
        let raw = json!({
            "congress": 118,
            "type": "HR",
            "number": "100",
            "title": "Example Act",
            "originChamber": "House",
            "introducedDate": "2024-01-05",
            "updateDate": "2024-01-20T15:52:10Z",
            "latestAction": {"actionDate": "2024-01-19", "text": "Referred to committee. "},
            "url": "https://api.congress.gov/v3/bill/118/hr/100"
        });
        let record = normalize(Family::Bill, &raw, min()).unwrap();
        assert_eq!(record.id, "118-hr-100");
        assert_eq!(record.congress, 118);
        assert_eq!(record.version, 1);
        assert_eq!(record.extras["bill_type"], json!("hr"));
        assert_eq!(record.extras["origin_chamber"], json!("house"));
        assert_eq!(
            record.extras["latest_action"],
            json!({"action_date": "2024-01-19", "text": "Referred to committee."})
        );
        assert_eq!(
            record.url.as_deref(),
            Some("https://api.congress.gov/v3/bill/118/hr/100")
        );
    }

    #[test]
    fn bill_missing_number_lists_the_field() {
        let raw = json!({"congress": 118, "type": "HR", "updateDate": "2024-01-20"});
        let err = normalize(Family::Bill, &raw, min()).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::MissingFields(vec!["number".into()])
        );
    }

    #[test]
    fn amendment_with_amended_bill() {
        let raw = json!({
            "congress": 117,
            "type": "SAMDT",
            "number": "2137",
            "purpose": "To improve the bill.",
            "updateDate": "2022-07-12",
            "amendedBill": {"congress": 117, "type": "S", "number": "1605"}
        });
        let record = normalize(Family::Amendment, &raw, min()).unwrap();
        assert_eq!(record.id, "117-samdt-2137");
        assert_eq!(
            record.extras["associated_bill"],
            json!({"congress": 117, "type": "s", "number": "1605"})
        );
    }

    #[test]
    fn summary_id_uses_version_code() {
        let raw = json!({
            "congress": 118,
            "updateDate": "2024-02-01",
            "actionDate": "2024-01-25",
            "actionDesc": "Introduced in House",
            "versionCode": "00",
            "bill": {"type": "HR", "number": "100"}
        });
        let record = normalize(Family::Summary, &raw, min()).unwrap();
        assert_eq!(record.id, "118-hr-100-sum-00");
        assert_eq!(
            record.extras["associated_bill"],
            json!({"congress": 118, "type": "hr", "number": "100"})
        );
    }

    #[test]
    fn summary_without_bill_is_rejected() {
        let raw = json!({
            "congress": 118,
            "updateDate": "2024-02-01",
            "actionDate": "2024-01-25"
        });
        let err = normalize(Family::Summary, &raw, min()).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::MissingFields(vec!["bill.type".into(), "bill.number".into()])
        );
    }
}
