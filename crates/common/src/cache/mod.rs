//! Bounded, persistent content cache
//!
//! Maps an item identifier to its fully fetched content blob. The cache holds
//! at most `capacity` entries and evicts in exact least-recently-used order;
//! both `get` and `put` count as a use. Blobs and their recency live in a
//! SQLite file, so the cache survives restarts.
//!
//! One instance is constructed at startup and shared by `Arc` with every
//! component that reads content.

mod recency;
mod store;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub use store::StoredEntry;

use recency::Recency;
use store::CacheStore;

/// Default number of cached blobs
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("failed to prepare cache directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub total_bytes: u64,
}

#[derive(Debug)]
struct Inner {
    store: CacheStore,
    recency: Recency,
    /// Last access sequence handed to the store
    clock: i64,
}

impl Inner {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }
}

/// LRU content cache backed by a SQLite file
#[derive(Debug)]
pub struct ContentCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl ContentCache {
    /// Open the cache file at `path`, restoring entries and recency order
    ///
    /// If the file holds more than `capacity` entries, the least recently
    /// used ones are evicted right away.
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, CacheError> {
        let store = CacheStore::open(path.as_ref()).await?;
        Self::with_store(store, capacity).await
    }

    /// A cache that is discarded when the process exits
    pub async fn in_memory(capacity: usize) -> Result<Self, CacheError> {
        let store = CacheStore::in_memory().await?;
        Self::with_store(store, capacity).await
    }

    async fn with_store(store: CacheStore, capacity: usize) -> Result<Self, CacheError> {
        let capacity = if capacity == 0 {
            tracing::warn!("content cache capacity of 0 raised to 1");
            1
        } else {
            capacity
        };
        let entries = store.entries().await?;

        let mut recency = Recency::default();
        let mut clock = 0;
        for entry in &entries {
            recency.touch(&entry.key);
            clock = clock.max(entry.last_used);
        }

        for key in recency.evict_to(capacity) {
            tracing::debug!(key = %key, "evicting cached content over capacity");
            store.delete(&key).await?;
        }

        tracing::info!(
            entries = recency.len(),
            capacity,
            "content cache ready"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                store,
                recency,
                clock,
            }),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the blob stored under `id`, marking it most recently used
    pub async fn get(&self, id: &str) -> Result<Option<Bytes>, CacheError> {
        let mut inner = self.inner.lock().await;
        if !inner.recency.contains(id) {
            return Ok(None);
        }

        let data = match inner.store.get(id).await? {
            Some(data) => data,
            None => {
                tracing::warn!(key = %id, "cached content missing from store");
                inner.recency.remove(id);
                return Ok(None);
            }
        };

        let seq = inner.tick();
        inner.store.touch(id, seq).await?;
        inner.recency.touch(id);

        tracing::trace!(key = %id, size = data.len(), "content cache hit");
        Ok(Some(Bytes::from(data)))
    }

    /// Store `data` under `id`, marking it most recently used and evicting the
    /// least recently used entry if the cache is over capacity
    pub async fn put(&self, id: &str, data: Bytes) -> Result<(), CacheError> {
        let mut inner = self.inner.lock().await;

        let seq = inner.tick();
        inner.store.put(id, &data, seq).await?;
        inner.recency.touch(id);

        let capacity = self.capacity;
        let evicted = inner.recency.evict_to(capacity);
        for key in evicted {
            tracing::debug!(key = %key, "evicting least recently used content");
            inner.store.delete(&key).await?;
        }

        tracing::debug!(key = %id, size = data.len(), "cached content");
        Ok(())
    }

    /// Whether `id` is cached, without touching its recency
    pub async fn contains(&self, id: &str) -> bool {
        self.inner.lock().await.recency.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.recency.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cached identifiers, most recently used first
    pub async fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let keys = inner
            .recency
            .most_recent_first()
            .map(str::to_string)
            .collect();
        keys
    }

    /// Stored entries with their sizes, most recently used first
    pub async fn entries(&self) -> Result<Vec<StoredEntry>, CacheError> {
        let inner = self.inner.lock().await;
        let mut entries = inner.store.entries().await?;
        entries.reverse();
        Ok(entries)
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let inner = self.inner.lock().await;
        Ok(CacheStats {
            entries: inner.recency.len(),
            capacity: self.capacity,
            total_bytes: inner.store.total_size().await?,
        })
    }

    /// Drop every cached blob
    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.lock().await;
        inner.store.clear().await?;
        inner.recency.clear();
        tracing::info!("content cache cleared");
        Ok(())
    }

    /// Close the backing store
    pub async fn close(&self) {
        self.inner.lock().await.store.close().await;
    }
}
