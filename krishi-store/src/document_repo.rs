use async_trait::async_trait;
use chrono::{DateTime, Utc};
use krishi_core::repository::{
    DocumentStore, FieldFilter, LogEntry, PendingLog, StoreError, StoredDocument,
};
use serde_json::Value;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::debug;

/// `DocumentStore` over the `documents` and `document_log` tables.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: Pool<Postgres>,
}

impl PgDocumentStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn current_version(&self, collection: &str, id: &str) -> Result<Option<i64>, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.map(|(v,)| v))
    }

    async fn conflict(&self, collection: &str, id: &str, expected: Option<i64>) -> StoreError {
        let found = match self.current_version(collection, id).await {
            Ok(found) => found,
            Err(e) => return e,
        };
        debug!("CAS miss on {}/{}: expected {:?}, found {:?}", collection, id, expected, found);
        StoreError::VersionConflict {
            collection: collection.to_string(),
            id: id.to_string(),
            expected,
            found,
        }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Create-only insert when `expected_version` is `None`, otherwise a versioned update.
/// `None` means the write lost the race.
async fn write_document(
    conn: &mut PgConnection,
    collection: &str,
    id: &str,
    body: &Value,
    expected_version: Option<i64>,
) -> Result<Option<i64>, StoreError> {
    let written: Option<(i64,)> = match expected_version {
        None => {
            sqlx::query_as(
                r#"
                INSERT INTO documents (collection, id, version, body, updated_at)
                VALUES ($1, $2, 1, $3, NOW())
                ON CONFLICT (collection, id) DO NOTHING
                RETURNING version
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend)?
        }
        Some(expected) => {
            sqlx::query_as(
                r#"
                UPDATE documents
                SET body = $3, version = version + 1, updated_at = NOW()
                WHERE collection = $1 AND id = $2 AND version = $4
                RETURNING version
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .bind(expected)
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend)?
        }
    };
    Ok(written.map(|(v,)| v))
}

async fn append_entry(conn: &mut PgConnection, stream: &str, key: &str, body: &Value) -> Result<i64, StoreError> {
    let (seq,): (i64,) = sqlx::query_as(
        "INSERT INTO document_log (stream, log_key, body) VALUES ($1, $2, $3) RETURNING seq",
    )
    .bind(stream)
    .bind(key)
    .bind(body)
    .fetch_one(&mut *conn)
    .await
    .map_err(backend)?;
    Ok(seq)
}

/// SELECT for `filter_count` path filters. Parameters: $1 collection, then (path, value) pairs.
pub fn build_query_sql(filter_count: usize) -> String {
    let mut sql = String::from("SELECT id, version, body FROM documents WHERE collection = $1");
    for i in 0..filter_count {
        let path = 2 + i * 2;
        sql.push_str(&format!(" AND body #>> ${}::text[] = ${}", path, path + 1));
    }
    sql.push_str(" ORDER BY id");
    sql
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let row: Option<(String, i64, Value)> = sqlx::query_as(
            "SELECT id, version, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(|(id, version, body)| StoredDocument { id, version, body }))
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let sql = build_query_sql(filters.len());
        let mut query = sqlx::query_as::<_, (String, i64, Value)>(&sql).bind(collection);
        for filter in filters {
            query = query.bind(filter.path.clone()).bind(filter.value.clone());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|(id, version, body)| StoredDocument { id, version, body })
            .collect())
    }

    async fn put_if_match(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        match write_document(&mut conn, collection, id, body, expected_version).await? {
            Some(version) => Ok(version),
            None => Err(self.conflict(collection, id, expected_version).await),
        }
    }

    async fn put_if_match_with_log(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
        expected_version: Option<i64>,
        log: &PendingLog,
    ) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let Some(version) = write_document(&mut tx, collection, id, body, expected_version).await? else {
            tx.rollback().await.map_err(backend)?;
            return Err(self.conflict(collection, id, expected_version).await);
        };
        append_entry(&mut tx, &log.stream, &log.key, &log.body).await?;

        tx.commit().await.map_err(backend)?;
        Ok(version)
    }

    async fn append(&self, stream: &str, key: &str, body: &Value) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        append_entry(&mut conn, stream, key, body).await
    }

    async fn read_stream(&self, stream: &str, key: Option<&str>) -> Result<Vec<LogEntry>, StoreError> {
        let rows: Vec<(i64, String, String, Value, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT seq, stream, log_key, body, recorded_at
            FROM document_log
            WHERE stream = $1 AND ($2::text IS NULL OR log_key = $2)
            ORDER BY seq
            "#,
        )
        .bind(stream)
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .map(|(seq, stream, key, body, recorded_at)| LogEntry { seq, stream, key, body, recorded_at })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_sql_numbers_parameters_in_pairs() {
        assert_eq!(
            build_query_sql(0),
            "SELECT id, version, body FROM documents WHERE collection = $1 ORDER BY id"
        );
        assert_eq!(
            build_query_sql(2),
            "SELECT id, version, body FROM documents WHERE collection = $1 \
             AND body #>> $2::text[] = $3 AND body #>> $4::text[] = $5 ORDER BY id"
        );
    }
}
