//! Photo items and their filenames

mod item;
mod naming;

pub use item::{unix_perms, Item, ItemError, DEFAULT_EXTENSION, TAKEN_FORMAT};
pub use naming::resolve_filename;
