/*!
 * Error types for the mqflow core crate.
 */
use thiserror::Error;

/// Error type for mqflow core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Clock error
    #[error("Clock error: {0}")]
    Clock(String),

    /// Value conversion error
    #[error("Value error: {0}")]
    Value(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for mqflow core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new runtime error
    pub fn runtime<S: AsRef<str>>(msg: S) -> Self {
        Error::Runtime(msg.as_ref().to_string())
    }

    /// Create a new clock error
    pub fn clock<S: AsRef<str>>(msg: S) -> Self {
        Error::Clock(msg.as_ref().to_string())
    }

    /// Create a new value error
    pub fn value<S: AsRef<str>>(msg: S) -> Self {
        Error::Value(msg.as_ref().to_string())
    }

    /// Create a new other error
    pub fn other<S: AsRef<str>>(msg: S) -> Self {
        Error::Other(msg.as_ref().to_string())
    }
}
