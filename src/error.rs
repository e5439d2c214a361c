//! Error type shared by every fallible operation in the crate.
//!
//! Degraded game data (unclassified seeds, missing prices) is never an error;
//! it is logged and valued at zero. What lands here is I/O, parsing and
//! snapshot validation.

use std::path::PathBuf;

use crate::garden::NodeId;

/// Errors raised while loading config, prices or garden snapshots.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON snapshot could not be parsed or written.
    #[error("failed to handle JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// The config parsed but holds out-of-range values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The same node id appears twice in one snapshot.
    #[error("duplicate node id {0} in garden snapshot")]
    DuplicateNode(NodeId),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
