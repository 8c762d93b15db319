//! Shared state of a running daemon
//!
//! Built once at startup: the content cache, the namespace with its fixed
//! directory schema, and the photo stream at `/stream`.

use std::sync::Arc;

use common::cache::{CacheError, ContentCache};
use common::fetch::{ContentClient, Fetcher};
use common::namespace::{Namespace, NamespaceError, Owner};
use common::stream::{PhotoStream, StreamError};

use crate::config::AppConfig;

/// Directories present in every mount, in creation order
pub const SCHEMA_DIRS: &[&str] = &[
    "/tags",
    "/tags/personal",
    "/tags/public",
    "/sets",
    "/date",
    "/stream",
];

/// Directory the photostream is bound to
pub const STREAM_DIR: &str = "/stream";

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to open content cache: {0}")]
    Cache(#[from] CacheError),
    #[error("failed to build namespace: {0}")]
    Namespace(#[from] NamespaceError),
    #[error("failed to create photo stream: {0}")]
    Stream(#[from] StreamError),
}

pub struct AppState {
    pub config: AppConfig,
    pub namespace: Arc<Namespace>,
    pub cache: Arc<ContentCache>,
    pub stream: Arc<PhotoStream>,
}

impl AppState {
    pub async fn build(
        config: AppConfig,
        owner: Owner,
        client: Arc<dyn ContentClient>,
    ) -> Result<Self, StateError> {
        let cache_path = config.cache_path();
        tracing::info!(path = %cache_path.display(), capacity = config.cache.capacity, "opening content cache");
        let cache = Arc::new(ContentCache::open(&cache_path, config.cache.capacity).await?);

        let namespace = Arc::new(build_namespace(owner)?);
        let fetcher = Arc::new(Fetcher::new(client, cache.clone()));
        let stream = PhotoStream::new(namespace.clone(), STREAM_DIR, fetcher)?;

        Ok(Self {
            config,
            namespace,
            cache,
            stream,
        })
    }
}

/// Namespace holding the fixed directory schema
pub fn build_namespace(owner: Owner) -> Result<Namespace, NamespaceError> {
    let namespace = Namespace::new(owner);
    for dir in SCHEMA_DIRS {
        namespace.create_dir_all(dir)?;
    }
    Ok(namespace)
}
