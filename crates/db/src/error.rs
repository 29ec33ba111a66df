//! Error types for table client operations

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reported by a [`crate::TableClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    /// Storage answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// No row matched the given id.
    #[error("no row with id '{id}' in table '{table}'")]
    NotFound { table: String, id: String },

    /// The response body could not be decoded.
    #[error("invalid response from storage: {0}")]
    InvalidResponse(String),

    /// Storage refused to serve the call (injected by in-memory tables).
    #[error("{0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}
