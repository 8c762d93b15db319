//! Flickr REST client
//!
//! Lists a user's photostream with `flickr.people.getPhotos`, asking for the
//! extras the photo stream needs to build its items.

mod credential;
mod response;

use std::time::Duration;

use reqwest::Client;
use url::Url;

use common::source::{PhotoPage, PhotoSource};

use crate::config::FlickrConfig;

pub use credential::{Credential, CredentialError};
pub use response::{Envelope, Photos, PhotosResponse};

pub const GET_PHOTOS_METHOD: &str = "flickr.people.getPhotos";
/// Extras requested with every listing page
pub const PHOTO_EXTRAS: &str = "original_format,last_update,date_upload,date_taken,url_o";

#[derive(Debug, thiserror::Error)]
pub enum FlickrError {
    #[error("invalid API endpoint {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Flickr API error {code}: {message}")]
    Api { code: i64, message: String },
}

#[derive(Debug, Clone)]
pub struct FlickrClient {
    endpoint: Url,
    user_id: String,
    credential: Credential,
    client: Client,
}

impl FlickrClient {
    pub fn new(config: &FlickrConfig, credential: Credential) -> Result<Self, FlickrError> {
        let endpoint =
            Url::parse(&config.api_url).map_err(|source| FlickrError::InvalidEndpoint {
                url: config.api_url.clone(),
                source,
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint,
            user_id: config.user_id.clone(),
            credential,
            client,
        })
    }

    /// URL of a call to `method` with `params` and the credential attached
    fn method_url(&self, method: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("method", method)
                .append_pair("format", "json")
                .append_pair("nojsoncallback", "1");
            for (key, value) in params {
                query.append_pair(key, value);
            }
            for (key, value) in self.credential.params() {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// One page of the user's photostream
    pub async fn get_photos(&self, per_page: u32, page: u32) -> Result<PhotoPage, FlickrError> {
        let url = self.method_url(
            GET_PHOTOS_METHOD,
            &[
                ("user_id", self.user_id.clone()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("extras", PHOTO_EXTRAS.to_string()),
            ],
        );

        tracing::debug!(method = GET_PHOTOS_METHOD, page, per_page, "calling Flickr");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FlickrError::HttpStatus {
                status: response.status(),
                body: response.text().await?,
            });
        }

        match response.json::<Envelope<PhotosResponse>>().await? {
            Envelope::Ok(body) => Ok(body.photos.into()),
            Envelope::Fail { code, message } => Err(FlickrError::Api { code, message }),
        }
    }
}

#[async_trait::async_trait]
impl PhotoSource for FlickrClient {
    async fn list_page(&self, per_page: u32, page: u32) -> anyhow::Result<PhotoPage> {
        Ok(self.get_photos(per_page, page).await?)
    }
}
