use std::path::PathBuf;
use thiserror::Error;

/// Rejected before any network activity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("app id must not be empty")]
    EmptyAppId,
    #[error("app id '{0}' may only contain letters, digits, '.', '_' and '-'")]
    InvalidAppId(String),
    #[error("target count must be greater than zero")]
    ZeroTarget,
    #[error("country code '{0}' must be two ASCII letters")]
    InvalidCountry(String),
    #[error("no review sources configured")]
    NoSources,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}
