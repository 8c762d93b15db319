pub mod config;
pub mod flickr;
#[cfg(feature = "fuse")]
pub mod fuse;
pub mod http;
pub mod logging;
#[cfg(feature = "fuse")]
pub mod process;
pub mod state;

pub use config::{AppConfig, ConfigError};
pub use state::{AppState, StateError};

/// Version string reported by `flickrfs version`
pub fn version() -> String {
    format!(
        "{} {} (fuse: {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        if cfg!(feature = "fuse") { "enabled" } else { "disabled" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_reports_fuse_support() {
        let version = version();
        assert!(version.starts_with("flickrfs-daemon "));
        if cfg!(feature = "fuse") {
            assert!(version.ends_with("(fuse: enabled)"));
        } else {
            assert!(version.ends_with("(fuse: disabled)"));
        }
    }
}
