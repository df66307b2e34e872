//! Error types for ovenv-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from the requirement engine
    #[error(transparent)]
    Core(#[from] ovenv_core::Error),

    /// Error from the preset store
    #[error(transparent)]
    Presets(#[from] ovenv_presets::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A subprocess exited with a non-zero status
    #[error("command failed: {command}")]
    CommandFailed { command: String },

    /// A subprocess could not be started at all
    #[error("command not found: {command}")]
    CommandNotFound { command: String },

    /// The requested interpreter is below the installer's minimum
    #[error(
        "Invalid version request: Python below {minimum} is not supported \
         but {requested} was requested"
    )]
    UnsupportedPython { requested: String, minimum: String },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
