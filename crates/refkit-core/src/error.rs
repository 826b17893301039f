//! Error types for refkit.

use thiserror::Error;

/// Result type alias using refkit's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for refkit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Query parameter failed validation. Carries the offending parameter
    /// name and a message naming the allowed values/format.
    #[error("Invalid parameter '{field}': {message}")]
    Validation { field: String, message: String },

    /// Underlying record store failed on the primary query path.
    #[error("Store error: {0}")]
    Store(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a validation error for a query parameter.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP-style status code for surfacing this error to transports.
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::NotFound(_) => 404,
            Error::Store(_) => 502,
            Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
