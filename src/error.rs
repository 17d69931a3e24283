use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised at the collaborator boundary: files, payloads, fetch workers
/// and configuration. Graph operations themselves never fail.
#[derive(Debug, Error)]
pub enum GalaxyError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid batch payload: {0}")]
    InvalidBatch(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl GalaxyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type GalaxyResult<T> = Result<T, GalaxyError>;
