//! Daemon configuration
//!
//! Read from `~/.flickrfs-ng/config.toml`. Every field has a default, so a
//! missing file or an empty one yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use common::cache::DEFAULT_CAPACITY;
use common::sync::{RetryPolicy, SyncConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_PAGE_SIZE};

/// Name of the directory under `$HOME` holding config, credential and cache
pub const CONFIG_DIR_NAME: &str = ".flickrfs-ng";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const AUTH_FILE_NAME: &str = "auth.txt";
pub const CACHE_FILE_NAME: &str = "cache.db";
pub const DEFAULT_API_URL: &str = "https://api.flickr.com/services/rest/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cache capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub flickr: FlickrConfig,
    pub cache: CacheConfig,
    pub sync: SyncSettings,
    pub mount: MountConfig,
    pub log: LogConfig,
    /// Directory relative paths resolve against; not read from the file
    #[serde(skip)]
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickrConfig {
    /// REST endpoint
    pub api_url: String,
    /// Whose photostream to mount; `me` is the authorized user
    pub user_id: String,
    /// Credential file; defaults to `auth.txt` in the config directory
    pub auth_file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_id: "me".to_string(),
            auth_file: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache database; defaults to `cache.db` in the config directory
    pub path: Option<PathBuf>,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub page_size: u32,
    pub max_attempts: u32,
    pub retry_backoff_secs: u64,
    /// Seconds between resync passes; 0 syncs once at mount time
    pub interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_secs: 1,
            interval_secs: 300,
        }
    }
}

impl SyncSettings {
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            page_size: self.page_size,
            retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_secs(self.retry_backoff_secs),
            ),
            interval: (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Kernel attribute cache timeout
    pub attr_ttl_secs: u64,
    pub allow_other: bool,
    pub auto_unmount: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            attr_ttl_secs: 1,
            allow_other: false,
            auto_unmount: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Directory for daily log files; stderr only when unset
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// `~/.flickrfs-ng`
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load the config at `path`, or the default location when `None`
    ///
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_dir()?.join(CONFIG_FILE_NAME),
        };
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            Self::parse(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.config_dir = config_dir;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.cache.capacity));
        }
        Ok(())
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.resolve(self.cache.path.as_deref(), CACHE_FILE_NAME)
    }

    pub fn auth_path(&self) -> PathBuf {
        self.resolve(self.flickr.auth_file.as_deref(), AUTH_FILE_NAME)
    }

    fn resolve(&self, configured: Option<&Path>, default_name: &str) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.config_dir.join(path),
            None => self.config_dir.join(default_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.flickr.api_url, DEFAULT_API_URL);
        assert_eq!(config.flickr.user_id, "me");
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.sync.page_size, 500);
        assert_eq!(config.sync.max_attempts, 3);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::parse(
            r#"
            [cache]
            capacity = 25

            [sync]
            interval_secs = 0
            retry_backoff_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.capacity, 25);
        assert!(config.cache.path.is_none());

        let sync = config.sync.to_sync_config();
        assert_eq!(sync.interval, None);
        assert_eq!(sync.retry.max_attempts, 3);
        assert_eq!(sync.retry.backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_periodic_sync_by_default() {
        let sync = SyncSettings::default().to_sync_config();
        assert_eq!(sync.interval, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_unknown_value_type_is_rejected() {
        assert!(AppConfig::parse("[cache]\ncapacity = \"lots\"").is_err());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = AppConfig::parse("[cache]\ncapacity = 0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCapacity(0))
        ));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\ncapacity = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_load_resolves_paths_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\npath = \"blobs/photos.db\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.cache_path(), dir.path().join("blobs/photos.db"));
        assert_eq!(config.auth_path(), dir.path().join("auth.txt"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.cache_path(), dir.path().join("cache.db"));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache\n").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
