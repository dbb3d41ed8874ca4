//! In-memory [`Store`] implementation.
//!
//! Backs tests and dry runs. Outcome scripting lets tests inject
//! throughput caps, per-item rejections, and fatal store states without a
//! network in the loop.

use std::collections::{BTreeMap, VecDeque};

use futures_util::stream;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use cm_domain::record::CanonicalRecord;
use cm_domain::Result;

use crate::adapter::{Store, TableProbe, WriteOutcome, MAX_BATCH_ITEMS};
use crate::BoxStream;

/// A single-table in-memory store keyed by record `id`.
pub struct MemoryStore {
    table: String,
    records: RwLock<BTreeMap<String, CanonicalRecord>>,
    /// Scripted outcomes consumed one per written item, before any write
    /// happens. An empty script means every write succeeds.
    script: Mutex<VecDeque<WriteOutcome>>,
    auth_failed: Mutex<bool>,
}

impl MemoryStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            records: RwLock::new(BTreeMap::new()),
            script: Mutex::new(VecDeque::new()),
            auth_failed: Mutex::new(false),
        }
    }

    /// Queue outcomes returned for the next writes, one per item.
    pub fn script_outcomes<I>(&self, outcomes: I)
    where
        I: IntoIterator<Item = WriteOutcome>,
    {
        self.script.lock().extend(outcomes);
    }

    /// Make every subsequent call report an auth failure.
    pub fn revoke_auth(&self) {
        *self.auth_failed.lock() = true;
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<CanonicalRecord> {
        self.records.read().get(id).cloned()
    }

    /// All stored ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    fn write_one(&self, record: &CanonicalRecord) -> WriteOutcome {
        if *self.auth_failed.lock() {
            return WriteOutcome::AuthFailed;
        }
        if let Some(outcome) = self.script.lock().pop_front() {
            if outcome != WriteOutcome::Stored {
                return outcome;
            }
        }
        self.records
            .write()
            .insert(record.id.clone(), record.clone());
        WriteOutcome::Stored
    }
}

/// Map a secondary-index name to its (hash, range) attribute pair.
fn index_attrs(index: &str) -> Option<(&'static str, &'static str)> {
    match index {
        "type-update-date" => Some(("type", "update_date")),
        "congress-type" => Some(("congress", "type")),
        "chamber-date" => Some(("chamber", "date")),
        "version-update-date" => Some(("version", "update_date")),
        _ => None,
    }
}

fn attr_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn describe_table(&self, table: &str) -> TableProbe {
        if *self.auth_failed.lock() {
            TableProbe::AuthFailed
        } else if table == self.table {
            TableProbe::Exists
        } else {
            TableProbe::Missing
        }
    }

    async fn put_item(&self, record: &CanonicalRecord) -> WriteOutcome {
        self.write_one(record)
    }

    async fn batch_put(&self, records: &[CanonicalRecord]) -> Vec<WriteOutcome> {
        debug_assert!(records.len() <= MAX_BATCH_ITEMS);
        records.iter().map(|r| self.write_one(r)).collect()
    }

    async fn query_prefix(
        &self,
        index: &str,
        hash: &str,
        range_prefix: Option<&str>,
    ) -> Result<BoxStream<'static, CanonicalRecord>> {
        let (hash_attr, range_attr) = index_attrs(index).ok_or_else(|| {
            cm_domain::Error::Store(format!("unknown index '{index}'"))
        })?;

        let matches: Vec<CanonicalRecord> = self
            .records
            .read()
            .values()
            .filter(|record| {
                let json = serde_json::to_value(record).unwrap_or(Value::Null);
                let hash_ok = json
                    .get(hash_attr)
                    .and_then(attr_as_string)
                    .is_some_and(|v| v == hash);
                let range_ok = match range_prefix {
                    None => true,
                    Some(prefix) => json
                        .get(range_attr)
                        .and_then(attr_as_string)
                        .is_some_and(|v| v.starts_with(prefix)),
                };
                hash_ok && range_ok
            })
            .cloned()
            .collect();

        Ok(Box::pin(stream::iter(matches)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_domain::family::Family;
    use futures_util::StreamExt;
    use serde_json::Map;

    fn record(id: &str, family: Family, congress: u32, update_date: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.into(),
            family,
            congress,
            update_date: update_date.parse().unwrap(),
            version: 1,
            url: None,
            extras: Map::new(),
        }
    }

    #[tokio::test]
    async fn describe_table_distinguishes_missing() {
        let store = MemoryStore::new("congress-data");
        assert_eq!(store.describe_table("congress-data").await, TableProbe::Exists);
        assert_eq!(store.describe_table("other").await, TableProbe::Missing);
    }

    #[tokio::test]
    async fn batch_put_stores_and_reports_in_order() {
        let store = MemoryStore::new("t");
        let records = vec![
            record("118-hr-1", Family::Bill, 118, "2024-01-20"),
            record("118-hr-2", Family::Bill, 118, "2024-01-20"),
        ];
        let outcomes = store.batch_put(&records).await;
        assert_eq!(outcomes, vec![WriteOutcome::Stored, WriteOutcome::Stored]);
        assert_eq!(store.ids(), vec!["118-hr-1", "118-hr-2"]);
    }

    #[tokio::test]
    async fn scripted_outcome_suppresses_the_write() {
        let store = MemoryStore::new("t");
        store.script_outcomes([WriteOutcome::ThroughputExceeded]);
        let r = record("118-hr-1", Family::Bill, 118, "2024-01-20");
        assert_eq!(store.put_item(&r).await, WriteOutcome::ThroughputExceeded);
        assert!(store.is_empty());
        // Script consumed; the retry succeeds.
        assert_eq!(store.put_item(&r).await, WriteOutcome::Stored);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn revoked_auth_fails_everything() {
        let store = MemoryStore::new("t");
        store.revoke_auth();
        assert_eq!(store.describe_table("t").await, TableProbe::AuthFailed);
        let r = record("x", Family::Bill, 118, "2024-01-20");
        assert_eq!(store.put_item(&r).await, WriteOutcome::AuthFailed);
    }

    #[tokio::test]
    async fn query_by_type_index() {
        let store = MemoryStore::new("t");
        store
            .batch_put(&[
                record("118-hr-1", Family::Bill, 118, "2024-01-20"),
                record("118-samdt-9", Family::Amendment, 118, "2024-01-21"),
            ])
            .await;

        let hits: Vec<_> = store
            .query_prefix("type-update-date", "bill", None)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "118-hr-1");

        let none: Vec<_> = store
            .query_prefix("type-update-date", "bill", Some("2023"))
            .await
            .unwrap()
            .collect()
            .await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn unknown_index_is_a_store_error() {
        let store = MemoryStore::new("t");
        assert!(store.query_prefix("no-such-index", "x", None).await.is_err());
    }
}
