//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::prelude::*;
use bytes::Bytes;
use url::Url;

/// Paginated listing served from memory
pub struct MemorySource {
    pub photos: Vec<RawPhoto>,
    pub calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(photos: Vec<RawPhoto>) -> Arc<Self> {
        Arc::new(Self {
            photos,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl PhotoSource for MemorySource {
    async fn list_page(&self, per_page: u32, page: u32) -> anyhow::Result<PhotoPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let per_page = per_page as usize;
        Ok(PhotoPage {
            pages: self.photos.len().div_ceil(per_page) as u32,
            photos: self
                .photos
                .iter()
                .skip((page as usize - 1) * per_page)
                .take(per_page)
                .cloned()
                .collect(),
        })
    }
}

/// Content server holding one blob per URL
#[derive(Debug, Default)]
pub struct MemoryContent {
    pub blobs: HashMap<String, Bytes>,
    pub fetches: AtomicUsize,
    pub probes: AtomicUsize,
}

#[async_trait::async_trait]
impl ContentClient for MemoryContent {
    async fn content_length(&self, url: &Url) -> Result<u64, FetchError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .get(url.as_str())
            .map(|b| b.len() as u64)
            .ok_or_else(|| FetchError::RemoteStatus {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::RemoteStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

pub fn url_for(id: &str) -> String {
    format!("https://farm1.example.com/{}_o.jpg", id)
}

pub fn photo(id: &str, title: &str) -> RawPhoto {
    RawPhoto {
        id: id.to_string(),
        title: title.to_string(),
        ispublic: true,
        originalformat: Some("jpg".to_string()),
        datetaken: "2019-07-14 18:30:00".to_string(),
        dateupload: 1_563_121_800,
        lastupdate: 1_563_200_000,
        url_o: Some(url_for(id)),
        ..Default::default()
    }
}

/// Content server with a distinct blob for every photo
pub fn content_for(photos: &[RawPhoto]) -> Arc<MemoryContent> {
    let blobs = photos
        .iter()
        .map(|p| (url_for(&p.id), Bytes::from(format!("image data for {}", p.id))))
        .collect();
    Arc::new(MemoryContent {
        blobs,
        ..Default::default()
    })
}

/// Namespace with a stream at `/stream`, backed by the cache file at `cache_path`
pub async fn setup_stream(
    client: Arc<MemoryContent>,
    cache_path: &Path,
) -> (Arc<PhotoStream>, Arc<ContentCache>) {
    let cache = Arc::new(ContentCache::open(cache_path, 10).await.unwrap());
    let fetcher = Arc::new(Fetcher::new(client, cache.clone()));
    let namespace = Arc::new(Namespace::default());
    for dir in ["/tags/personal", "/tags/public", "/sets", "/date"] {
        namespace.create_dir_all(dir).unwrap();
    }
    let stream = PhotoStream::new(namespace, "/stream", fetcher).unwrap();
    (stream, cache)
}
