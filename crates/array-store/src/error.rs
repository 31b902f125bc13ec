//! Error types for array store access.

use thiserror::Error;

/// Errors that can occur while opening or reading a chunked array.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Failed to connect to the backing store.
    #[error("failed to connect to store '{url}': {message}")]
    ConnectFailed { url: String, message: String },

    /// Failed to open an array or group node.
    #[error("failed to open '{path}': {message}")]
    OpenFailed { path: String, message: String },

    /// Failed to read data from an opened array.
    #[error("failed to read array data: {0}")]
    ReadFailed(String),

    /// The selection does not fit the array shape.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The array element type cannot be decoded to numbers.
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// The requested node does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Create a ConnectFailed error.
    pub fn connect_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an OpenFailed error.
    pub fn open_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidSelection error.
    pub fn invalid_selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
