//! Engine error types

use crate::aws::error::RemoteError;
use crate::store::StoreError;
use thiserror::Error;

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, CollectError>;

/// Errors surfaced by the collection engine
#[derive(Error, Debug)]
pub enum CollectError {
    /// The remote API rejected the call and it is not worth retrying
    #[error("{service} {region} {operation} failed: {source}")]
    Remote {
        service: String,
        region: String,
        operation: String,
        #[source]
        source: RemoteError,
    },

    /// The response shape breaks the pagination contract
    #[error("pagination error in {operation}: {message}")]
    Pagination { operation: String, message: String },

    /// The client exposes no operation with this name
    #[error("{service} client has no operation named {operation}")]
    UnknownOperation { service: String, operation: String },

    /// The retry budget ran out before the call succeeded
    #[error("{operation} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: RemoteError,
    },

    /// The scheduled job went away without delivering a result
    #[error("{operation} was abandoned before it produced a result")]
    Abandoned { operation: String },

    /// Prefix expansion met data it cannot partition
    #[error("prefix expansion failed at {prefix:?}: {message}")]
    Expansion { prefix: String, message: String },

    /// Executor bound below one
    #[error("Attempt to create Executor with max < 1 (got {0})")]
    InvalidConcurrency(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CollectError {
    pub fn pagination(operation: &str, message: impl Into<String>) -> Self {
        Self::Pagination {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// The underlying remote error, if this failure came from the API
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote { source, .. } => Some(source),
            Self::RetriesExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}
