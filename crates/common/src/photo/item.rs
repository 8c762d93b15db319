use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::NaiveDateTime;
use url::Url;

use crate::source::RawPhoto;

/// Format of the capture timestamp reported by the remote listing
pub const TAKEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Extension used when the listing does not report the original format
pub const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("photo {0} has no original content url")]
    MissingUrl(String),
    #[error("photo {id} has an invalid content url {url:?}: {reason}")]
    InvalidUrl {
        id: String,
        url: String,
        reason: String,
    },
}

/// Metadata of one remote photo, mapped onto one file node
///
/// The item never holds content bytes; those live in the content cache under
/// [`Item::id`].
#[derive(Debug)]
pub struct Item {
    id: String,
    title: String,
    ext: String,
    perm: u16,
    taken: String,
    uploaded: i64,
    updated: i64,
    url: Url,
    /// Content length, 0 until resolved
    size: AtomicU64,
}

impl Item {
    pub fn from_raw(raw: RawPhoto) -> Result<Self, ItemError> {
        let url = raw
            .url_o
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ItemError::MissingUrl(raw.id.clone()))?;
        let url = Url::parse(&url).map_err(|e| ItemError::InvalidUrl {
            id: raw.id.clone(),
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let ext = raw
            .originalformat
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Ok(Self {
            perm: unix_perms(raw.isfriend, raw.isfamily, raw.ispublic),
            title: sanitize(&raw.title),
            ext: sanitize(&ext),
            id: raw.id,
            taken: raw.datetaken,
            uploaded: raw.dateupload,
            updated: raw.lastupdate,
            url,
            size: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn perm(&self) -> u16 {
        self.perm
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Raw capture timestamp as reported by the listing
    pub fn taken(&self) -> &str {
        &self.taken
    }

    /// Date-only portion of the capture timestamp
    pub fn taken_date(&self) -> &str {
        self.taken.split(' ').next().unwrap_or_default()
    }

    pub fn taken_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.taken, TAKEN_FORMAT).ok()
    }

    /// Upload time, used as the node's creation time
    pub fn ctime(&self) -> SystemTime {
        epoch_to_system_time(self.uploaded)
    }

    /// Last update time, used as the node's modification time
    pub fn mtime(&self) -> SystemTime {
        epoch_to_system_time(self.updated)
    }

    /// Base name before collision resolution: the title, or the capture date
    /// for untitled photos
    pub fn base_name(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if !self.taken_date().is_empty() {
            self.taken_date()
        } else {
            &self.id
        }
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    pub(crate) fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Release);
    }
}

/// Derive permission bits from the three visibility flags
///
/// Each flag ORs in its own group of bits on top of `0o744`, so combinations
/// are additive.
pub fn unix_perms(isfriend: bool, isfamily: bool, ispublic: bool) -> u16 {
    let mut perms = 0o744;
    if isfriend {
        perms |= 0o010;
    }
    if isfamily {
        perms |= 0o020;
    }
    if ispublic {
        perms |= 0o011;
    }
    perms
}

fn sanitize(name: &str) -> String {
    name.replace(['/', '\0'], "_")
}

fn epoch_to_system_time(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}
