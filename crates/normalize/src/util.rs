//! Field extraction and cleaning helpers shared by the family extractors.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use cm_domain::family::Family;

use crate::dates::parse_iso_date;
use crate::{RejectReason, Rejection};

pub(crate) const CHAMBERS: [&str; 3] = ["house", "senate", "joint"];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Raw record access
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A raw upstream record, checked to be an object.
pub(crate) struct Raw<'a> {
    pub family: Family,
    obj: &'a Map<String, Value>,
}

impl<'a> Raw<'a> {
    pub fn new(family: Family, value: &'a Value) -> Result<Self, Rejection> {
        match value.as_object() {
            Some(obj) => Ok(Self { family, obj }),
            None => Err(Rejection {
                family,
                reason: RejectReason::NotAnObject,
            }),
        }
    }

    fn reject(&self, reason: RejectReason) -> Rejection {
        Rejection {
            family: self.family,
            reason,
        }
    }

    /// Reject unless every listed key is present with a usable value.
    pub fn check_required(&self, keys: &[&str]) -> Result<(), Rejection> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.has_usable(key))
            .map(|key| key.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(self.reject(RejectReason::MissingFields(missing)))
        }
    }

    /// Present with a non-null, non-empty-after-trim value. Dotted keys
    /// reach one level into a nested object.
    fn has_usable(&self, key: &str) -> bool {
        let value = match key.split_once('.') {
            Some((outer, inner)) => match self.obj.get(outer) {
                Some(Value::Object(nested)) => nested.get(inner),
                _ => None,
            },
            None => self.obj.get(key),
        };
        match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// A trimmed, non-empty string field.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.obj.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            // Upstream sometimes serializes numbers as numbers, sometimes
            // as strings; accept both where a string is expected.
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// A positive integer field, accepting numeric strings.
    pub fn u32(&self, key: &str) -> Option<u32> {
        match self.obj.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.obj.get(key)
    }

    /// A required string field. Call after `check_required`; still rejects
    /// when the value has an unusable type.
    pub fn req_str(&self, key: &str) -> Result<String, Rejection> {
        self.str(key).ok_or_else(|| {
            self.reject(RejectReason::MissingFields(vec![key.to_string()]))
        })
    }

    /// A required positive-integer field; non-numeric values reject.
    pub fn req_u32(&self, key: &str) -> Result<u32, Rejection> {
        self.u32(key).ok_or_else(|| {
            self.reject(RejectReason::MissingFields(vec![key.to_string()]))
        })
    }

    /// A nested object field, as its own `Raw` view.
    pub fn nested(&self, key: &str) -> Option<Raw<'a>> {
        match self.obj.get(key) {
            Some(Value::Object(obj)) => Some(Raw {
                family: self.family,
                obj,
            }),
            _ => None,
        }
    }

    /// An optional chamber field: lowercased, restricted to
    /// house/senate/joint. A present-but-invalid value rejects the record.
    pub fn chamber(&self, key: &str) -> Result<Option<String>, Rejection> {
        match self.str(key) {
            None => Ok(None),
            Some(value) => {
                let lower = value.to_lowercase();
                if CHAMBERS.contains(&lower.as_str()) {
                    Ok(Some(lower))
                } else {
                    Err(self.reject(RejectReason::InvalidChamber { value }))
                }
            }
        }
    }

    /// A required chamber field. Call after `check_required`.
    pub fn req_chamber(&self, key: &str) -> Result<String, Rejection> {
        self.chamber(key)?.ok_or_else(|| {
            self.reject(RejectReason::MissingFields(vec![key.to_string()]))
        })
    }

    /// An optional date field, normalized and floor-checked.
    pub fn date(&self, key: &str, min_date: NaiveDate) -> Result<Option<NaiveDate>, Rejection> {
        match self.str(key) {
            None => Ok(None),
            Some(value) => match parse_iso_date(&value) {
                Some(date) if date >= min_date => Ok(Some(date)),
                _ => Err(self.reject(RejectReason::InvalidDate {
                    field: key.to_string(),
                    value,
                })),
            },
        }
    }

    /// A required date field. Call after `check_required`.
    pub fn req_date(&self, key: &str, min_date: NaiveDate) -> Result<NaiveDate, Rejection> {
        self.date(key, min_date)?.ok_or_else(|| {
            self.reject(RejectReason::MissingFields(vec![key.to_string()]))
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Extras builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Collects family-specific attributes, silently dropping absent values so
/// no null or empty field is ever stored.
#[derive(Default)]
pub(crate) struct Extras {
    map: Map<String, Value>,
}

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_str(&mut self, key: &str, value: Option<String>) -> &mut Self {
        if let Some(v) = value {
            self.map.insert(key.to_string(), Value::String(v));
        }
        self
    }

    pub fn put_u32(&mut self, key: &str, value: Option<u32>) -> &mut Self {
        if let Some(v) = value {
            self.map.insert(key.to_string(), Value::from(v));
        }
        self
    }

    pub fn put_date(&mut self, key: &str, value: Option<NaiveDate>) -> &mut Self {
        if let Some(v) = value {
            self.map
                .insert(key.to_string(), Value::String(v.to_string()));
        }
        self
    }

    /// Deep-clean and keep a nested value (object or list) as-is.
    pub fn put_clean(&mut self, key: &str, value: Option<&Value>) -> &mut Self {
        if let Some(cleaned) = value.and_then(clean_value) {
            self.map.insert(key.to_string(), cleaned);
        }
        self
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }
}

/// Recursively trim strings and drop nulls, empty strings, empty objects
/// and empty arrays.
pub(crate) fn clean_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
        }
        Value::Array(items) => {
            let cleaned: Vec<Value> = items.iter().filter_map(clean_value).collect();
            (!cleaned.is_empty()).then_some(Value::Array(cleaned))
        }
        Value::Object(obj) => {
            let cleaned: Map<String, Value> = obj
                .iter()
                .filter_map(|(k, v)| clean_value(v).map(|v| (k.clone(), v)))
                .collect();
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_value_strips_nulls_and_empties() {
        let dirty = json!({
            "keep": "  value  ",
            "drop_null": null,
            "drop_empty": "   ",
            "nested": {"inner": null, "ok": 7},
            "list": ["  a ", "", null]
        });
        let cleaned = clean_value(&dirty).unwrap();
        assert_eq!(
            cleaned,
            json!({"keep": "value", "nested": {"ok": 7}, "list": ["a"]})
        );
    }

    #[test]
    fn clean_value_drops_fully_empty_containers() {
        assert_eq!(clean_value(&json!({"a": null})), None);
        assert_eq!(clean_value(&json!([])), None);
        assert_eq!(clean_value(&json!("")), None);
        assert_eq!(clean_value(&json!(false)), Some(json!(false)));
    }

    #[test]
    fn required_check_lists_every_missing_field() {
        let value = json!({"present": 1, "blank": "  "});
        let raw = Raw::new(Family::Bill, &value).unwrap();
        let err = raw
            .check_required(&["present", "blank", "absent"])
            .unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::MissingFields(vec!["blank".into(), "absent".into()])
        );
    }

    #[test]
    fn dotted_required_keys_reach_into_nested_objects() {
        let value = json!({"bill": {"type": "HR"}});
        let raw = Raw::new(Family::Summary, &value).unwrap();
        assert!(raw.check_required(&["bill.type"]).is_ok());
        assert!(raw.check_required(&["bill.number"]).is_err());
    }

    #[test]
    fn numeric_strings_parse_as_u32() {
        let value = json!({"congress": "118", "number": 42});
        let raw = Raw::new(Family::Bill, &value).unwrap();
        assert_eq!(raw.u32("congress"), Some(118));
        assert_eq!(raw.u32("number"), Some(42));
        assert_eq!(raw.str("number"), Some("42".into()));
    }

    #[test]
    fn chamber_validation() {
        let value = json!({"ok": "House", "bad": "Plenary"});
        let raw = Raw::new(Family::Committee, &value).unwrap();
        assert_eq!(raw.chamber("ok").unwrap(), Some("house".into()));
        assert_eq!(raw.chamber("missing").unwrap(), None);
        let err = raw.chamber("bad").unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::InvalidChamber {
                value: "Plenary".into()
            }
        );
    }
}
