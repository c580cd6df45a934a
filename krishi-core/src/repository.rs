use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document plus the version the store assigned on its last write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub version: i64,
    pub body: Value,
}

/// Equality filter on a dot-separated JSON path, e.g. `location.district_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub path: Vec<String>,
    pub value: String,
}

impl FieldFilter {
    pub fn eq(path: &str, value: impl Into<String>) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
            value: value.into(),
        }
    }

    /// Evaluate the filter against a document body. Scalars compare by their text form.
    pub fn matches(&self, body: &Value) -> bool {
        let mut current = body;
        for segment in &self.path {
            match current.get(segment) {
                Some(next) => current = next,
                None => return false,
            }
        }

        match current {
            Value::String(s) => s == &self.value,
            Value::Number(n) => n.to_string() == self.value,
            Value::Bool(b) => b.to_string() == self.value,
            _ => false,
        }
    }
}

/// One record in an append-only stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: i64,
    pub stream: String,
    pub key: String,
    pub body: Value,
    pub recorded_at: DateTime<Utc>,
}

/// Stream record written together with a document, see [`DocumentStore::put_if_match_with_log`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLog {
    pub stream: String,
    pub key: String,
    pub body: Value,
}

impl PendingLog {
    pub fn new(stream: &str, key: impl Into<String>, body: Value) -> Self {
        Self {
            stream: stream.to_string(),
            key: key.into(),
            body,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Version conflict on {collection}/{id}: expected {expected:?}, found {found:?}")]
    VersionConflict {
        collection: String,
        id: String,
        expected: Option<i64>,
        found: Option<i64>,
    },

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Generic document store: everything the engine needs from persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// All documents in `collection` matching every filter, ordered by id.
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Optimistic write. `expected_version == None` means create-only.
    /// Returns the new version.
    async fn put_if_match(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError>;

    /// `put_if_match` plus `append` as one unit: either both are stored or neither is.
    /// Returns the new document version.
    async fn put_if_match_with_log(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
        expected_version: Option<i64>,
        log: &PendingLog,
    ) -> Result<i64, StoreError>;

    /// Append to a stream. Entries are never updated or removed.
    async fn append(&self, stream: &str, key: &str, body: &Value) -> Result<i64, StoreError>;

    /// Read a stream in append order, optionally restricted to one key.
    async fn read_stream(&self, stream: &str, key: Option<&str>) -> Result<Vec<LogEntry>, StoreError>;
}
