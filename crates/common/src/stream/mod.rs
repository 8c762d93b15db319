//! Photo stream: one remote collection bound to one namespace subtree
//!
//! The stream owns the filename table for its directory. Discovered photos
//! are named, given a file node and registered in one critical section, so
//! concurrent discoveries can never claim the same name. Reads resolve a
//! filename to its item and go through the fetcher and content cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::fetch::{FetchError, Fetcher};
use crate::namespace::{path, NamespaceError, Namespace, NodeAttrs, NodeId, NodeKind};
use crate::photo::{resolve_filename, Item, ItemError};
use crate::source::{PhotoSource, RawPhoto};
use crate::sync::{SyncConfig, SyncHandle, Syncer};

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("no such photo: {0}")]
    NotFound(String),
    #[error("invalid photo: {0}")]
    InvalidItem(#[from] ItemError),
    #[error("photo stream {0} is already bound to a collection")]
    AlreadyBound(String),
    #[error("namespace error: {0}")]
    Namespace(#[from] NamespaceError),
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// A registered photo and its file node
#[derive(Debug, Clone)]
pub struct PhotoEntry {
    pub item: Arc<Item>,
    pub node: NodeId,
}

#[derive(Debug, Default)]
struct PhotoTable {
    /// Filename to entry, in discovery order
    by_name: IndexMap<String, PhotoEntry>,
    /// Remote identifier to filename
    by_id: HashMap<String, String>,
}

#[derive(Debug)]
pub struct PhotoStream {
    path: String,
    root: NodeId,
    namespace: Arc<Namespace>,
    fetcher: Arc<Fetcher>,
    table: RwLock<PhotoTable>,
    bound: AtomicBool,
}

impl PhotoStream {
    /// Create a stream rooted at the directory `dir_path`, creating it if needed
    pub fn new(
        namespace: Arc<Namespace>,
        dir_path: &str,
        fetcher: Arc<Fetcher>,
    ) -> Result<Arc<Self>, StreamError> {
        let path = path::normalize(dir_path);
        let root = namespace.create_dir_all(&path)?;

        Ok(Arc::new(Self {
            path,
            root,
            namespace,
            fetcher,
            table: RwLock::new(PhotoTable::default()),
            bound: AtomicBool::new(false),
        }))
    }

    /// Path of the stream directory
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Node of the stream directory
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    /// Bind the stream to `source` and start its syncer in the background
    ///
    /// Must be called from within a tokio runtime. A stream can be bound once.
    pub fn bind(
        self: &Arc<Self>,
        source: Arc<dyn PhotoSource>,
        config: SyncConfig,
        shutdown: watch::Receiver<()>,
    ) -> Result<SyncHandle, StreamError> {
        if self.bound.swap(true, Ordering::SeqCst) {
            return Err(StreamError::AlreadyBound(self.path.clone()));
        }

        tracing::info!(stream = %self.path, "binding photo stream");
        Ok(Syncer::new(self.clone(), source, config).spawn(shutdown))
    }

    /// Register a photo found by the syncer
    ///
    /// Returns the assigned filename, or `None` if a photo with the same
    /// identifier is already registered.
    pub fn on_discovered(&self, raw: RawPhoto) -> Result<Option<String>, StreamError> {
        let item = Item::from_raw(raw)?;

        let mut table = self.table.write();
        if table.by_id.contains_key(item.id()) {
            tracing::trace!(id = %item.id(), "photo already registered");
            return Ok(None);
        }

        let filename = resolve_filename(item.base_name(), item.ext(), |candidate| {
            table.by_name.contains_key(candidate)
        });

        let attrs = self
            .namespace
            .file_attrs(item.perm(), item.ctime(), item.mtime());
        let node = self
            .namespace
            .create_child(self.root, &filename, NodeKind::File, attrs)
            .inspect_err(|e| {
                tracing::error!(stream = %self.path, filename = %filename, "name collision in namespace: {}", e)
            })?;

        tracing::debug!(id = %item.id(), filename = %filename, node = %node, "registered photo");
        table.by_id.insert(item.id().to_string(), filename.clone());
        table.by_name.insert(
            filename.clone(),
            PhotoEntry {
                item: Arc::new(item),
                node,
            },
        );

        Ok(Some(filename))
    }

    /// Attributes of the photo at `path`
    pub fn get_attributes(&self, path: &str) -> Result<NodeAttrs, StreamError> {
        if path::parent(path) != self.path {
            return Err(StreamError::NotFound(path.to_string()));
        }

        let entry = self
            .entry(path::filename(path))
            .ok_or_else(|| StreamError::NotFound(path.to_string()))?;
        self.namespace
            .attributes_of(entry.node)
            .ok_or_else(|| StreamError::NotFound(path.to_string()))
    }

    /// Registered filenames, in discovery order
    pub fn list_files(&self) -> Vec<String> {
        self.table.read().by_name.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, filename: &str) -> Option<PhotoEntry> {
        self.table.read().by_name.get(filename).cloned()
    }

    /// Read up to `length` bytes of `filename` starting at `offset`
    ///
    /// Fetches the content on a cache miss. Reads past the end return an
    /// empty buffer.
    pub async fn read(&self, filename: &str, offset: u64, length: u64) -> Result<Bytes, StreamError> {
        let entry = self
            .entry(filename)
            .ok_or_else(|| StreamError::NotFound(filename.to_string()))?;

        let data = self.fetcher.content(&entry.item).await?;
        if entry.item.size() != data.len() as u64 {
            self.record_size(&entry, data.len() as u64);
        }

        Ok(slice(&data, offset, length))
    }

    /// Resolve the size of `filename` if it is still unknown
    pub async fn prefetch(&self, filename: &str) -> Result<u64, StreamError> {
        let entry = self
            .entry(filename)
            .ok_or_else(|| StreamError::NotFound(filename.to_string()))?;
        if entry.item.size() > 0 {
            return Ok(entry.item.size());
        }

        let size = self.fetcher.probe_size(&entry.item).await?;
        self.record_size(&entry, size);
        Ok(size)
    }

    /// Probe the size of every photo whose size is still unknown
    ///
    /// Returns the number of photos sized.
    pub async fn resolve_sizes(&self) -> usize {
        let (pending, nodes): (Vec<_>, HashMap<_, _>) = {
            let table = self.table.read();
            let pending: Vec<_> = table
                .by_name
                .values()
                .filter(|e| e.item.size() == 0)
                .collect();
            (
                pending.iter().map(|e| e.item.clone()).collect(),
                pending
                    .iter()
                    .map(|e| (e.item.id().to_string(), e.node))
                    .collect(),
            )
        };

        if pending.is_empty() {
            return 0;
        }

        let sized = self.fetcher.probe_sizes(pending).await;
        let count = sized.len();
        for (item, size) in sized {
            if let Some(node) = nodes.get(item.id()) {
                self.record_size(&PhotoEntry { item, node: *node }, size);
            }
        }

        tracing::info!(stream = %self.path, sized = count, "resolved photo sizes");
        count
    }

    fn record_size(&self, entry: &PhotoEntry, size: u64) {
        entry.item.set_size(size);
        if let Err(e) = self.namespace.set_size(entry.node, size) {
            tracing::warn!(id = %entry.item.id(), "failed to record size: {}", e);
        }
    }
}

fn slice(data: &Bytes, offset: u64, length: u64) -> Bytes {
    let len = data.len() as u64;
    let start = offset.min(len);
    let end = start.saturating_add(length).min(len);
    data.slice(start as usize..end as usize)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use url::Url;

    use super::*;
    use crate::cache::ContentCache;
    use crate::fetch::ContentClient;

    #[derive(Debug, Default)]
    struct StaticClient {
        fetches: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ContentClient for StaticClient {
        async fn content_length(&self, url: &Url) -> Result<u64, FetchError> {
            Ok(url.path().len() as u64)
        }

        async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(url.path().to_string()))
        }
    }

    fn raw(id: &str, title: &str) -> RawPhoto {
        RawPhoto {
            id: id.to_string(),
            title: title.to_string(),
            originalformat: Some("jpg".to_string()),
            datetaken: "2020-05-01 10:00:00".to_string(),
            dateupload: 1_588_327_200,
            lastupdate: 1_588_327_300,
            url_o: Some(format!("https://farm.example.com/photo-{}.jpg", id)),
            ..Default::default()
        }
    }

    async fn stream() -> (Arc<PhotoStream>, Arc<StaticClient>) {
        let client = Arc::new(StaticClient::default());
        let cache = Arc::new(ContentCache::in_memory(10).await.unwrap());
        let fetcher = Arc::new(Fetcher::new(client.clone(), cache));
        let namespace = Arc::new(Namespace::default());
        (
            PhotoStream::new(namespace, "/stream", fetcher).unwrap(),
            client,
        )
    }

    #[tokio::test]
    async fn test_same_titles_get_counters() {
        let (stream, _) = stream().await;
        for id in ["1", "2", "3"] {
            stream.on_discovered(raw(id, "Sunset")).unwrap();
        }

        assert_eq!(
            stream.list_files(),
            vec!["Sunset.jpg", "Sunset 001.jpg", "Sunset 002.jpg"]
        );
        assert_eq!(
            stream.namespace().list_children("/stream").unwrap(),
            stream.list_files()
        );
    }

    #[tokio::test]
    async fn test_huge_title_counters_keep_counting() {
        let (stream, _) = stream().await;

        let at_max = "x 18446744073709551615";
        assert_eq!(
            stream.on_discovered(raw("1", at_max)).unwrap().as_deref(),
            Some("x 18446744073709551615.jpg")
        );
        assert_eq!(
            stream.on_discovered(raw("2", at_max)).unwrap().as_deref(),
            Some("x 18446744073709551616.jpg")
        );

        let past_max = "y 99999999999999999999";
        stream.on_discovered(raw("3", past_max)).unwrap();
        assert_eq!(
            stream.on_discovered(raw("4", past_max)).unwrap().as_deref(),
            Some("y 100000000000000000000.jpg")
        );
        assert_eq!(stream.len(), 4);
    }

    #[tokio::test]
    async fn test_untitled_photo_uses_capture_date() {
        let (stream, _) = stream().await;
        let name = stream.on_discovered(raw("1", "")).unwrap();
        assert_eq!(name.as_deref(), Some("2020-05-01.jpg"));
    }

    #[tokio::test]
    async fn test_rediscovery_is_ignored() {
        let (stream, _) = stream().await;
        assert!(stream.on_discovered(raw("1", "a")).unwrap().is_some());
        assert!(stream.on_discovered(raw("1", "a")).unwrap().is_none());
        assert_eq!(stream.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_item_is_rejected() {
        let (stream, _) = stream().await;
        let mut photo = raw("1", "a");
        photo.url_o = None;
        assert!(matches!(
            stream.on_discovered(photo),
            Err(StreamError::InvalidItem(_))
        ));
        assert!(stream.is_empty());
    }

    #[tokio::test]
    async fn test_get_attributes() {
        let (stream, _) = stream().await;
        let mut photo = raw("1", "Sunset");
        photo.isfamily = true;
        stream.on_discovered(photo).unwrap();

        let attrs = stream.get_attributes("/stream/Sunset.jpg").unwrap();
        assert_eq!(attrs.perm, 0o764);
        assert_eq!(attrs.size, 0);

        assert!(matches!(
            stream.get_attributes("/stream/Nope.jpg"),
            Err(StreamError::NotFound(_))
        ));
        assert!(matches!(
            stream.get_attributes("/other/Sunset.jpg"),
            Err(StreamError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_ranges() {
        let (stream, client) = stream().await;
        stream.on_discovered(raw("1", "Sunset")).unwrap();

        // content is the url path: "/photo-1.jpg"
        let all = stream.read("Sunset.jpg", 0, 4096).await.unwrap();
        assert_eq!(&all[..], b"/photo-1.jpg");
        assert_eq!(&stream.read("Sunset.jpg", 1, 5).await.unwrap()[..], b"photo");
        assert!(stream.read("Sunset.jpg", 100, 5).await.unwrap().is_empty());
        assert!(stream.read("Sunset.jpg", 0, 0).await.unwrap().is_empty());
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);

        // the fetched length becomes the file size
        assert_eq!(stream.get_attributes("/stream/Sunset.jpg").unwrap().size, 12);
    }

    #[tokio::test]
    async fn test_read_unknown_file() {
        let (stream, _) = stream().await;
        assert!(matches!(
            stream.read("missing.jpg", 0, 10).await,
            Err(StreamError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_sizes_updates_nodes() {
        let (stream, _) = stream().await;
        stream.on_discovered(raw("1", "a")).unwrap();
        stream.on_discovered(raw("22", "b")).unwrap();

        assert_eq!(stream.resolve_sizes().await, 2);
        assert_eq!(stream.get_attributes("/stream/a.jpg").unwrap().size, 12);
        assert_eq!(stream.get_attributes("/stream/b.jpg").unwrap().size, 13);

        // nothing left to probe
        assert_eq!(stream.resolve_sizes().await, 0);
    }

    #[tokio::test]
    async fn test_prefetch() {
        let (stream, client) = stream().await;
        stream.on_discovered(raw("1", "a")).unwrap();
        assert_eq!(stream.prefetch("a.jpg").await.unwrap(), 12);
        assert_eq!(stream.entry("a.jpg").unwrap().item.size(), 12);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_discovery_never_duplicates() {
        let (stream, _) = stream().await;

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let stream = stream.clone();
            tasks.spawn(async move { stream.on_discovered(raw(&i.to_string(), "Sunset")).unwrap() });
        }
        let mut names = Vec::new();
        while let Some(name) = tasks.join_next().await {
            names.push(name.unwrap().unwrap());
        }

        names.sort();
        names.dedup();
        assert_eq!(names.len(), 32);
        assert_eq!(stream.len(), 32);
        assert!(names.contains(&"Sunset.jpg".to_string()));
        assert!(names.contains(&"Sunset 031.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_bind_twice_fails() {
        struct EmptySource;

        #[async_trait::async_trait]
        impl PhotoSource for EmptySource {
            async fn list_page(&self, _: u32, _: u32) -> anyhow::Result<crate::source::PhotoPage> {
                Ok(Default::default())
            }
        }

        let (stream, _) = stream().await;
        let (_tx, rx) = watch::channel(());
        let handle = stream
            .bind(Arc::new(EmptySource), SyncConfig::default(), rx.clone())
            .unwrap();
        assert!(matches!(
            stream.bind(Arc::new(EmptySource), SyncConfig::default(), rx),
            Err(StreamError::AlreadyBound(_))
        ));
        handle.join().await;
    }
}
