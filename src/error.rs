//! Error types for indexing and query execution.
//!
//! Lookups that find nothing are not errors: queries return `None` (or an
//! empty list) for unknown symbols. Only malformed input and cancellation
//! surface as `QueryError`.

use std::path::PathBuf;
use thiserror::Error;

/// Rejected while constructing a [`crate::MethodSignature`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Method name must not be empty")]
    EmptyName,

    #[error("Declaring type of '{method}' must not be empty")]
    EmptyDeclaringType { method: String },

    #[error("Parameter '{parameter}' of '{method}' has position {found}, expected {expected}")]
    ParameterOrdinal {
        method: String,
        parameter: String,
        expected: usize,
        found: usize,
    },
}

/// Errors surfaced to callers of the analysis queries.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Query '{operation}' was cancelled")]
    Cancelled { operation: &'static str },

    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

impl QueryError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl From<SignatureError> for QueryError {
    fn from(e: SignatureError) -> Self {
        QueryError::InvalidInput {
            field: "signature",
            reason: e.to_string(),
        }
    }
}

/// Errors from loading, storing, or ingesting front-end facts.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid declaration '{name}': {reason}")]
    InvalidDeclaration { name: String, reason: String },
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Serialization(e.to_string())
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
pub type IndexResult<T> = Result<T, IndexError>;
