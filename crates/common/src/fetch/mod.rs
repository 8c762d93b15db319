//! Remote content fetching
//!
//! The [`Fetcher`] issues size probes and full content downloads through a
//! [`ContentClient`], and stores downloaded blobs in the [`ContentCache`].
//! Concurrent first reads of the same item share a single download.

mod client;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::task::JoinSet;

pub use client::{ContentClient, FetchError};

use crate::cache::ContentCache;
use crate::photo::Item;

/// Downloads photo content and probes its size
#[derive(Debug)]
pub struct Fetcher {
    client: Arc<dyn ContentClient>,
    cache: Arc<ContentCache>,
    /// Per-identifier download locks for fetches in flight
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Fetcher {
    pub fn new(client: Arc<dyn ContentClient>, cache: Arc<ContentCache>) -> Self {
        Self {
            client,
            cache,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    /// Read the content length of `item` without downloading the body
    pub async fn probe_size(&self, item: &Item) -> Result<u64, FetchError> {
        let size = self.client.content_length(item.url()).await?;
        tracing::debug!(url = %item.url(), size, "probed content size");
        Ok(size)
    }

    /// Download the full content of `item` and store it in the cache
    pub async fn fetch_content(&self, item: &Item) -> Result<Bytes, FetchError> {
        tracing::info!(id = %item.id(), url = %item.url(), "fetching content");
        let data = self.client.fetch(item.url()).await?;
        self.cache.put(item.id(), data.clone()).await?;
        tracing::debug!(id = %item.id(), size = data.len(), "content fetched");
        Ok(data)
    }

    /// Content of `item`, from the cache or downloaded on a miss
    ///
    /// At most one download per identifier is in flight; concurrent callers
    /// wait for it and then read the cached blob.
    pub async fn content(&self, item: &Item) -> Result<Bytes, FetchError> {
        if let Some(data) = self.cache.get(item.id()).await? {
            return Ok(data);
        }

        let lock = self
            .inflight
            .lock()
            .entry(item.id().to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            match self.cache.get(item.id()).await {
                Ok(Some(data)) => Ok(data),
                Ok(None) => self.fetch_content(item).await,
                Err(e) => Err(e.into()),
            }
        };

        // the last waiter out removes the lock entry
        let mut inflight = self.inflight.lock();
        drop(lock);
        if inflight
            .get(item.id())
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            inflight.remove(item.id());
        }

        result
    }

    /// Probe the size of every item, one task per origin host
    ///
    /// Probes for one host run sequentially so they can reuse a connection;
    /// hosts run concurrently. A failed probe is logged and left out of the
    /// result without affecting the others.
    pub async fn probe_sizes(self: &Arc<Self>, items: Vec<Arc<Item>>) -> Vec<(Arc<Item>, u64)> {
        let groups = group_by_host(items);
        tracing::info!(hosts = groups.len(), "probing content sizes");

        let mut tasks = JoinSet::new();
        for (host, items) in groups {
            let fetcher = self.clone();
            tasks.spawn(async move {
                let mut sized = Vec::with_capacity(items.len());
                for item in items {
                    match fetcher.probe_size(&item).await {
                        Ok(size) => sized.push((item, size)),
                        Err(e) => {
                            tracing::warn!(host = %host, id = %item.id(), "size probe failed: {}", e)
                        }
                    }
                }
                sized
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(sized) => results.extend(sized),
                Err(e) => tracing::error!("size probe task failed: {}", e),
            }
        }
        results
    }
}

/// Group items by the host of their content URL, preserving item order
fn group_by_host(items: Vec<Arc<Item>>) -> Vec<(String, Vec<Arc<Item>>)> {
    let mut groups: indexmap::IndexMap<String, Vec<Arc<Item>>> = indexmap::IndexMap::new();
    for item in items {
        let host = item.url().host_str().unwrap_or_default().to_string();
        groups.entry(host).or_default().push(item);
    }
    groups.into_iter().collect()
}
