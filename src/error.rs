//! Errors raised by snapshot collectors.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to produce a snapshot for one reporting cycle.
///
/// A collector error only drops the affected report section for the
/// current cycle; the reporting loop keeps running.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data in {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("no cgroup hierarchy mounted for controller '{0}'")]
    NotMounted(String),
}

impl CollectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

pub type CollectResult<T> = Result<T, CollectError>;
