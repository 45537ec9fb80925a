//! SQLite document store.
//!
//! All collections share one `documents` table keyed by
//! `(collection, id)`. Uses `sqlx` with WAL mode; each [`WriteBatch`] is
//! applied inside a single transaction.
//!
//! # Usage
//! ```rust,no_run
//! use neoetl_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("./neoetl.db").await?;
//! let scratch = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use neoetl_core::store::{Collection, Document, DocumentStore, StoreError, WriteBatch};

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database at `path`, a file path or a
    /// `sqlite:` URL.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };
        let pool = SqlitePool::connect(&url).await.map_err(backend)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// A private in-memory database. One connection, so every query sees
    /// the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id         TEXT NOT NULL,
                body       TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    fn parse_body(collection: Collection, id: &str, body: &str) -> Result<Document, StoreError> {
        let body = serde_json::from_str(body).map_err(|e| StoreError::Serialization {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Document::new(id, body))
    }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let n = batch.len();
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for (collection, doc) in batch.into_writes() {
            let body = doc.body.to_string();
            sqlx::query(
                "INSERT OR REPLACE INTO documents (collection, id, body)
                 VALUES (?, ?, ?)",
            )
            .bind(collection.as_str())
            .bind(&doc.id)
            .bind(&body)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;

        debug!(writes = n, "batch committed");
        Ok(())
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(|r| Self::parse_body(collection, id, &r.get::<String, _>("body")))
            .transpose()
    }

    async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM documents WHERE collection = ?")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }

    async fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, body FROM documents
             WHERE collection = ? AND substr(id, 1, ?) = ?
             ORDER BY id",
        )
        .bind(collection.as_str())
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|r| {
                let id: String = r.get("id");
                let body: String = r.get("body");
                Self::parse_body(collection, &id, &body)
            })
            .collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_and_find() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .upsert_many(
                Collection::OfferHash,
                vec![Document::new("abc", json!({"status": "open"}))],
            )
            .await
            .unwrap();
        store
            .upsert_many(
                Collection::OfferHash,
                vec![Document::new("abc", json!({"status": "filled"}))],
            )
            .await
            .unwrap();

        let doc = store.find_one(Collection::OfferHash, "abc").await.unwrap().unwrap();
        assert_eq!(doc.body["status"], "filled");
        assert_eq!(store.count(Collection::OfferHash).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Blocks).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn prefix_scan() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut batch = WriteBatch::new();
        for id in ["AX_2_maker_want", "AX_1_deposit", "AY_1_deposit"] {
            batch.put(Collection::AddressTransactions, Document::new(id, json!({"id": id})));
        }
        store.apply(batch).await.unwrap();

        let docs = store
            .scan_prefix(Collection::AddressTransactions, "AX_")
            .await
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["AX_1_deposit", "AX_2_maker_want"]);
    }
}
