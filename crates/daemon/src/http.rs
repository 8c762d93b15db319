//! Photo content over HTTP

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};
use url::Url;

use common::fetch::{ContentClient, FetchError};

/// [`ContentClient`] over a shared connection pool
#[derive(Debug, Clone)]
pub struct HttpContentClient {
    client: Client,
}

impl HttpContentClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn transport(url: &Url, error: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

fn check_status(url: &Url, response: Response) -> Result<Response, FetchError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(FetchError::RemoteStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}

#[async_trait::async_trait]
impl ContentClient for HttpContentClient {
    async fn content_length(&self, url: &Url) -> Result<u64, FetchError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| transport(url, e))?;
        let response = check_status(url, response)?;

        // the body of a HEAD response is empty, so read the header itself
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or_else(|| FetchError::MissingContentLength(url.to_string()))
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport(url, e))?;
        let response = check_status(url, response)?;
        response.bytes().await.map_err(|e| transport(url, e))
    }
}
