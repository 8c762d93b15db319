//! Remote photo source boundary
//!
//! The remote service is consumed through [`PhotoSource`], a paginated listing
//! of photo metadata rows. Rows use the remote service's field names so a
//! client can deserialize its responses straight into [`RawPhoto`].

use serde::Deserialize;
use serde_with::{serde_as, BoolFromInt, DisplayFromStr, PickFirst};

/// One metadata row of a remote listing
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPhoto {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde_as(as = "PickFirst<(BoolFromInt, _)>")]
    #[serde(default)]
    pub isfriend: bool,
    #[serde_as(as = "PickFirst<(BoolFromInt, _)>")]
    #[serde(default)]
    pub isfamily: bool,
    #[serde_as(as = "PickFirst<(BoolFromInt, _)>")]
    #[serde(default)]
    pub ispublic: bool,
    /// Extension of the original upload, e.g. `jpg`
    #[serde(default)]
    pub originalformat: Option<String>,
    /// Capture time, `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub datetaken: String,
    /// Upload time, seconds since the epoch
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub dateupload: i64,
    /// Last metadata update, seconds since the epoch
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub lastupdate: i64,
    /// URL of the original content
    #[serde(default)]
    pub url_o: Option<String>,
}

/// One page of a remote listing
#[derive(Debug, Clone, Default)]
pub struct PhotoPage {
    /// Total number of pages in the listing
    pub pages: u32,
    pub photos: Vec<RawPhoto>,
}

/// A remote, paginated photo collection
///
/// Implementations attach their credential to every call. Any error is
/// treated as transient by the syncer.
#[async_trait::async_trait]
pub trait PhotoSource: Send + Sync + 'static {
    /// Fetch page `page` (1-based) of the listing with `per_page` rows per page
    async fn list_page(&self, per_page: u32, page: u32) -> anyhow::Result<PhotoPage>;
}
