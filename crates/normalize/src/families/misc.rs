//! Treaties and congress metadata records.

use chrono::NaiveDate;

use cm_domain::record::CanonicalRecord;

use super::build;
use crate::util::{Extras, Raw};
use crate::{RejectReason, Rejection};

pub(crate) fn treaty(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["congressReceived", "number", "updateDate"])?;

    let congress = raw.req_u32("congressReceived")?;
    let number = raw.req_str("number")?;
    let update_date = raw.req_date("updateDate", min_date)?;
    let suffix = raw.str("suffix").map(|s| s.to_lowercase());

    let id = match &suffix {
        Some(suffix) => format!("{congress}-treaty-{number}-{suffix}"),
        None => format!("{congress}-treaty-{number}"),
    };

    let mut extras = Extras::new();
    extras
        .put_str("treaty_number", Some(number))
        .put_str("suffix", suffix)
        .put_str("topic", raw.str("topic"))
        .put_u32("congress_considered", raw.u32("congressConsidered"))
        .put_date("transmitted_date", raw.date("transmittedDate", min_date)?)
        .put_clean("parts", raw.value("parts"));

    Ok(build(raw, id, congress, update_date, extras))
}

pub(crate) fn congress(raw: &Raw<'_>, min_date: NaiveDate) -> Result<CanonicalRecord, Rejection> {
    raw.check_required(&["name", "updateDate"])?;

    let name = raw.req_str("name")?;
    let update_date = raw.req_date("updateDate", min_date)?;

    // The list response spells the ordinal only inside the name
    // ("118th Congress"); an explicit number field wins when present.
    let number = raw.u32("number").or_else(|| leading_number(&name));
    let number = number.ok_or_else(|| Rejection {
        family: raw.family,
        reason: RejectReason::MissingFields(vec!["number".into()]),
    })?;

    let mut extras = Extras::new();
    extras
        .put_str("name", Some(name))
        .put_u32("start_year", raw.u32("startYear"))
        .put_u32("end_year", raw.u32("endYear"))
        .put_clean("sessions", raw.value("sessions"));

    let id = format!("congress-{number}");
    Ok(build(raw, id, number, update_date, extras))
}

fn leading_number(name: &str) -> Option<u32> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
