//! Error types for the augur library.

use thiserror::Error;

/// Result type alias using augur's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during history mining.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Git operation error.
    #[error("Git error: {0}")]
    Git(String),

    /// Issue tracker error.
    #[error("Tracker error: {0}")]
    Tracker(String),

    /// Release catalog error. An empty catalog is the one fatal precondition:
    /// without releases there is no temporal anchoring for any ticket.
    #[error("Release catalog error: {0}")]
    Catalog(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV output error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Self::Git(err.to_string())
    }
}

impl Error {
    /// Create a new git error.
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git(message.into())
    }

    /// Create a new tracker error.
    pub fn tracker(message: impl Into<String>) -> Self {
        Self::Tracker(message.into())
    }

    /// Create a new catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
