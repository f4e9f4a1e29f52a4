//! Error types for the ztwatch state store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open state database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("failed to encode record {key}: {reason}")]
    Encode { key: String, reason: String },

    #[error("corrupt record {key}: {reason}")]
    Decode { key: String, reason: String },
}

impl StateError {
    pub(crate) fn encode(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn decode(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}
