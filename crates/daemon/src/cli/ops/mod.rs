use clap::Subcommand;

pub mod cache;
#[cfg(feature = "fuse")]
pub mod mount;
pub mod version;

pub use cache::Cache;
#[cfg(feature = "fuse")]
pub use mount::Mount;
pub use version::Version;

crate::command_enum! {
    #[cfg(feature = "fuse")]
    (Mount, Mount),
    (Cache, Cache),
    (Version, Version),
}

impl Command {
    /// Whether this command runs the long-lived daemon
    pub fn is_daemon(&self) -> bool {
        #[cfg(feature = "fuse")]
        if matches!(self, Command::Mount(_)) {
            return true;
        }
        false
    }
}
