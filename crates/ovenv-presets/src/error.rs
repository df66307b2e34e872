//! Error types for ovenv-presets

use std::path::PathBuf;

/// Result type for ovenv-presets operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading preset configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse presets at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("preset '{name}' not found")]
    PresetNotFound { name: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
