//! Error types for key-value operations.

use common::BackendError;

/// Error type for key-value operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A key that was required to exist is absent.
    NotFound(String),

    /// A configuration value that cannot be used, such as a zero chunk size.
    InvalidConfiguration(String),

    /// Failures reported by the backend, passed through untouched.
    Backend(BackendError),

    /// Encoding or decoding errors for keys and values.
    Encoding(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound(key) => write!(f, "Required key not found: {}", key),
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Backend(err) => write!(f, "Backend error: {}", err),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
        }
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Error::Backend(err)
    }
}

/// Result type alias for key-value operations.
pub type Result<T> = std::result::Result<T, Error>;
