//! The canonical record every ingested item is normalized to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::family::Family;

/// Current canonical schema generation.
pub const SCHEMA_VERSION: u32 = 1;

/// A validated, normalized item ready for storage.
///
/// `id` is deterministic per family so reruns converge on the same key.
/// `extras` holds the family-specific attributes (flat scalars plus nested
/// maps/lists); the normalizer guarantees it contains no nulls, no empty
/// strings, and no untrimmed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub family: Family,
    pub congress: u32,
    pub update_date: NaiveDate,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}
