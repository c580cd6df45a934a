use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::repository::{DocumentStore, FieldFilter, LogEntry, PendingLog, StoreError, StoredDocument};

type Collection = BTreeMap<String, (i64, Value)>;

/// Process-local document store for tests and single-node development runs.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
    log: RwLock<Vec<LogEntry>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Lock order is always collections, then log.

fn write_version(
    collections: &mut HashMap<String, Collection>,
    collection: &str,
    id: &str,
    body: &Value,
    expected_version: Option<i64>,
) -> Result<i64, StoreError> {
    let docs = collections.entry(collection.to_string()).or_default();
    let found = docs.get(id).map(|(version, _)| *version);

    if found != expected_version {
        return Err(StoreError::VersionConflict {
            collection: collection.to_string(),
            id: id.to_string(),
            expected: expected_version,
            found,
        });
    }

    let next = found.unwrap_or(0) + 1;
    docs.insert(id.to_string(), (next, body.clone()));
    Ok(next)
}

fn push_entry(log: &mut Vec<LogEntry>, stream: &str, key: &str, body: &Value) -> i64 {
    let seq = log.len() as i64 + 1;
    log.push(LogEntry {
        seq,
        stream: stream.to_string(),
        key: key.to_string(),
        body: body.clone(),
        recorded_at: Utc::now(),
    });
    seq
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|(version, body)| StoredDocument {
                id: id.to_string(),
                version: *version,
                body: body.clone(),
            }))
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, (_, body))| filters.iter().all(|f| f.matches(body)))
            .map(|(id, (version, body))| StoredDocument {
                id: id.clone(),
                version: *version,
                body: body.clone(),
            })
            .collect())
    }

    async fn put_if_match(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        let mut collections = self.collections.write().await;
        write_version(&mut collections, collection, id, body, expected_version)
    }

    async fn put_if_match_with_log(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
        expected_version: Option<i64>,
        log: &PendingLog,
    ) -> Result<i64, StoreError> {
        let mut collections = self.collections.write().await;
        let mut entries = self.log.write().await;
        let version = write_version(&mut collections, collection, id, body, expected_version)?;
        push_entry(&mut entries, &log.stream, &log.key, &log.body);
        Ok(version)
    }

    async fn append(&self, stream: &str, key: &str, body: &Value) -> Result<i64, StoreError> {
        let mut log = self.log.write().await;
        Ok(push_entry(&mut log, stream, key, body))
    }

    async fn read_stream(&self, stream: &str, key: Option<&str>) -> Result<Vec<LogEntry>, StoreError> {
        let log = self.log.read().await;
        Ok(log
            .iter()
            .filter(|entry| entry.stream == stream)
            .filter(|entry| key.map_or(true, |k| entry.key == k))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_update_with_version() {
        let store = MemoryDocumentStore::new();
        let v1 = store.put_if_match("bookings", "b1", &json!({"status": "pending"}), None).await.unwrap();
        assert_eq!(v1, 1);

        let v2 = store.put_if_match("bookings", "b1", &json!({"status": "confirmed"}), Some(1)).await.unwrap();
        assert_eq!(v2, 2);

        let doc = store.get("bookings", "b1").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.body["status"], "confirmed");
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemoryDocumentStore::new();
        store.put_if_match("bookings", "b1", &json!({}), None).await.unwrap();
        store.put_if_match("bookings", "b1", &json!({}), Some(1)).await.unwrap();

        let err = store.put_if_match("bookings", "b1", &json!({}), Some(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { found: Some(2), .. }));

        let dup = store.put_if_match("bookings", "b1", &json!({}), None).await.unwrap_err();
        assert!(matches!(dup, StoreError::VersionConflict { expected: None, .. }));
    }

    #[tokio::test]
    async fn test_logged_write_is_all_or_nothing() {
        let store = MemoryDocumentStore::new();
        let created = PendingLog::new("booking_events", "b1", json!({"to": "pending"}));
        store
            .put_if_match_with_log("bookings", "b1", &json!({"status": "pending"}), None, &created)
            .await
            .unwrap();

        // Stale version: neither the document nor the log entry lands
        let stale = PendingLog::new("booking_events", "b1", json!({"to": "confirmed"}));
        let err = store
            .put_if_match_with_log("bookings", "b1", &json!({"status": "confirmed"}), Some(7), &stale)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { found: Some(1), .. }));

        let doc = store.get("bookings", "b1").await.unwrap().unwrap();
        assert_eq!(doc.body["status"], "pending");
        let entries = store.read_stream("booking_events", Some("b1")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body["to"], "pending");
    }

    #[tokio::test]
    async fn test_query_filters_and_orders_by_id() {
        let store = MemoryDocumentStore::new();
        store.put_if_match("vendors", "v2", &json!({"district_key": "pune"}), None).await.unwrap();
        store.put_if_match("vendors", "v1", &json!({"district_key": "pune"}), None).await.unwrap();
        store.put_if_match("vendors", "v3", &json!({"district_key": "satara"}), None).await.unwrap();

        let hits = store.query("vendors", &[FieldFilter::eq("district_key", "pune")]).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn test_stream_is_append_only_and_keyed() {
        let store = MemoryDocumentStore::new();
        store.append("booking_events", "b1", &json!({"to": "pending"})).await.unwrap();
        store.append("booking_events", "b2", &json!({"to": "pending"})).await.unwrap();
        store.append("booking_events", "b1", &json!({"to": "confirmed"})).await.unwrap();

        let b1 = store.read_stream("booking_events", Some("b1")).await.unwrap();
        assert_eq!(b1.len(), 2);
        assert!(b1[0].seq < b1[1].seq);
        assert_eq!(b1[1].body["to"], "confirmed");

        assert_eq!(store.read_stream("booking_events", None).await.unwrap().len(), 3);
    }
}
