use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no credential at {0:?}; create it with at least an `api_key` entry")]
    Missing(PathBuf),
    #[error("failed to read credential {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid credential {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("credential {0:?} has no `api_key`")]
    NoApiKey(PathBuf),
}

/// Request parameters that authorize calls to the photo service
///
/// Stored as a flat TOML table, e.g.
///
/// ```toml
/// api_key = "..."
/// auth_token = "..."
/// ```
///
/// Every entry is attached to every request as a query parameter.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    params: BTreeMap<String, String>,
}

impl Credential {
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        if !path.exists() {
            return Err(CredentialError::Missing(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let params: BTreeMap<String, String> =
            toml::from_str(&raw).map_err(|source| CredentialError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if !params.contains_key("api_key") {
            return Err(CredentialError::NoApiKey(path.to_path_buf()));
        }

        tracing::debug!(path = %path.display(), params = params.len(), "loaded credential");
        Ok(Self { params })
    }

    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// Values are secrets
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish()
    }
}
