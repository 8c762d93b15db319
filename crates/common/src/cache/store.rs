//! SQLite backing store for the content cache.
//!
//! One row per cached blob. `last_used` holds a monotonically increasing
//! access sequence so recency order can be rebuilt after a restart.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::CacheError;

/// A cached blob as listed by [`CacheStore::entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub size: u64,
    pub last_used: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    /// Open (or create) the cache file at `path`
    pub(crate) async fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;

        tracing::info!("Content cache store opened at {:?}", path);
        Ok(store)
    }

    /// Open a store that lives only as long as this process
    pub(crate) async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        // a single connection that is never recycled, otherwise the
        // in-memory database would vanish with it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                size INTEGER NOT NULL,
                last_used INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_entries_last_used ON entries(last_used)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All entries, least recently used first
    pub(crate) async fn entries(&self) -> Result<Vec<StoredEntry>, CacheError> {
        let rows = sqlx::query("SELECT key, size, last_used FROM entries ORDER BY last_used ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| StoredEntry {
                key: row.get("key"),
                size: row.get::<i64, _>("size") as u64,
                last_used: row.get("last_used"),
            })
            .collect())
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let row = sqlx::query("SELECT data FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("data")))
    }

    pub(crate) async fn put(&self, key: &str, data: &[u8], seq: i64) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO entries (key, data, size, last_used, created_at)
            VALUES (?, ?, ?, ?, strftime('%s', 'now'))
            ON CONFLICT(key) DO UPDATE SET
                data = excluded.data,
                size = excluded.size,
                last_used = excluded.last_used
            "#,
        )
        .bind(key)
        .bind(data)
        .bind(data.len() as i64)
        .bind(seq)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(crate) async fn touch(&self, key: &str, seq: i64) -> Result<(), CacheError> {
        sqlx::query("UPDATE entries SET last_used = ? WHERE key = ?")
            .bind(seq)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub(crate) async fn clear(&self) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub(crate) async fn total_size(&self) -> Result<u64, CacheError> {
        let row = sqlx::query("SELECT COALESCE(SUM(size), 0) as total FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("total") as u64)
    }

    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }
}
