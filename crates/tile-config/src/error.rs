//! Error types for configuration resolution.

use array_store::StoreError;
use thiserror::Error;

use crate::types::ValueSource;

/// Errors raised while resolving a tile source configuration.
///
/// All of these are fatal to source creation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A property failed validation.
    #[error("invalid '{field}' from {origin}: {constraint}")]
    Invalid {
        field: String,
        constraint: String,
        origin: ValueSource,
    },

    /// A mandatory dataset read failed.
    #[error("dataset unavailable: {0}")]
    Store(#[from] StoreError),

    /// No source could provide a required property.
    #[error("unable to resolve '{0}': no user value, dataset value or fallback")]
    Unresolved(String),
}

impl ConfigError {
    /// Create an Invalid error.
    pub fn invalid(field: impl Into<String>, constraint: impl Into<String>, origin: ValueSource) -> Self {
        Self::Invalid {
            field: field.into(),
            constraint: constraint.into(),
            origin,
        }
    }

    /// The offending field, when the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Invalid { field, .. } | Self::Unresolved(field) => Some(field),
            Self::Store(_) => None,
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
