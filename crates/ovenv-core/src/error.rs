//! Error types for ovenv-core

use std::path::PathBuf;

/// Result type for ovenv-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while gathering and filtering requirements
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid requirement '{line}': {message}")]
    InvalidRequirement { line: String, message: String },

    #[error("failed to parse manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_requirement(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequirement {
            line: line.into(),
            message: message.into(),
        }
    }
}
