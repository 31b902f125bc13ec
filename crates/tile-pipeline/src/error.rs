//! Error types for tile loading.

use array_store::StoreError;
use thiserror::Error;
use tile_config::ConfigError;

/// Errors raised by a tile source or while producing one tile.
///
/// Configuration errors are only produced at source creation. Everything
/// else is scoped to a single tile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TileError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The value array does not have the expected shape.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Pixel processing failed inside the worker.
    #[error("processing failed: {0}")]
    Processing(String),

    /// A view-state operation was given an argument it cannot accept.
    #[error("invalid state change: {0}")]
    InvalidState(String),

    /// The worker stopped before replying.
    #[error("worker {0} disconnected")]
    WorkerDisconnected(usize),
}

impl TileError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

/// Result type for tile operations.
pub type Result<T> = std::result::Result<T, TileError>;
