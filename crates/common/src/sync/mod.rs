//! Background synchronization of a photo stream with its remote collection
//!
//! A [`Syncer`] walks the remote listing page by page and hands every row to
//! the stream. A discovery run that fails is retried from the first page;
//! rows already registered are skipped, so a retry only adds what the failed
//! run missed. After a successful run, the sizes of new photos are probed.
//!
//! The syncer runs on its own task and reports progress through the
//! [`SyncHandle`] returned when a stream is bound.

mod jobs;
mod retry;
mod syncer;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use jobs::{SyncDispatcher, SyncReceiver, SyncRequest};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use syncer::{SyncHandle, Syncer};

use crate::stream::StreamError;

/// Rows requested per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to list page {page}: {error:#}")]
    Transient { page: u32, error: anyhow::Error },
    #[error("photo stream rejected a discovered photo: {0}")]
    Stream(#[from] StreamError),
    #[error("abandoned after {attempts} attempts: {last}")]
    Abandoned {
        attempts: u32,
        #[source]
        last: Box<SyncError>,
    },
    #[error("sync worker has stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    pub page_size: u32,
    pub retry: RetryPolicy,
    /// Pause between passes; `None` runs a single pass
    pub interval: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            interval: None,
        }
    }
}

/// Result of one sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassOutcome {
    Completed {
        /// Photos registered by this pass
        discovered: usize,
        /// Photos whose size was resolved by this pass
        sized: usize,
    },
    Abandoned {
        attempts: u32,
        error: String,
    },
}

impl PassOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PassOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Finished passes, completed or abandoned
    pub passes: u64,
    /// Whether a pass is in progress
    pub running: bool,
    pub last: Option<PassOutcome>,
}
