//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed log contents.
    #[error("invalid log format: {0}")]
    InvalidFormat(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] monoscan_core::Error),
}

impl From<Error> for monoscan_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => Self::Io(e),
            Error::CoreError(e) => e,
            Error::Json(e) => Self::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Error::InvalidFormat(msg) => {
                Self::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
            }
        }
    }
}
