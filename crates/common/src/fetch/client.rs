use std::fmt::Debug;

use bytes::Bytes;
use url::Url;

use crate::cache::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("remote returned status {status} for {url}")]
    RemoteStatus { url: String, status: u16 },
    #[error("no content length reported for {0}")]
    MissingContentLength(String),
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("content cache error: {0}")]
    Cache(#[from] CacheError),
}

/// HTTP access to remote content URLs
#[async_trait::async_trait]
pub trait ContentClient: Debug + Send + Sync + 'static {
    /// Content length of `url` from a metadata-only request
    async fn content_length(&self, url: &Url) -> Result<u64, FetchError>;

    /// Full body of `url`; a non-success status is [`FetchError::RemoteStatus`]
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError>;
}
