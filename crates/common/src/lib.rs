//! Core of flickrfs: the namespace tree, photo streams, the sync worker and
//! the persistent content cache.
//!
//! Nothing in this crate talks to FUSE or to a concrete remote service. The
//! daemon provides a [`source::PhotoSource`] and a [`fetch::ContentClient`]
//! and exposes the [`namespace::Namespace`] through the kernel.

pub mod cache;
pub mod fetch;
pub mod namespace;
pub mod photo;
pub mod source;
pub mod stream;
pub mod sync;

pub mod prelude {
    pub use crate::cache::{CacheError, CacheStats, ContentCache};
    pub use crate::fetch::{ContentClient, FetchError, Fetcher};
    pub use crate::namespace::{Namespace, NamespaceError, NodeAttrs, NodeId, NodeKind, Owner};
    pub use crate::photo::Item;
    pub use crate::source::{PhotoPage, PhotoSource, RawPhoto};
    pub use crate::stream::{PhotoStream, StreamError};
    pub use crate::sync::{PassOutcome, SyncConfig, SyncError, SyncHandle, SyncStatus};
}
