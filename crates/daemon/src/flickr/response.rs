//! Wire format of `flickr.people.getPhotos` JSON responses

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use common::source::{PhotoPage, RawPhoto};

/// Top-level response, tagged by its `stat` field
#[derive(Debug, Deserialize)]
#[serde(tag = "stat", rename_all = "lowercase")]
pub enum Envelope<T> {
    Ok(T),
    Fail {
        #[serde(default)]
        code: i64,
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct PhotosResponse {
    pub photos: Photos,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct Photos {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub page: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub photo: Vec<RawPhoto>,
}

impl From<Photos> for PhotoPage {
    fn from(photos: Photos) -> Self {
        PhotoPage {
            pages: photos.pages,
            photos: photos.photo,
        }
    }
}
