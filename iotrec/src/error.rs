//! Handler error types.

use thiserror::Error;

use crate::clients::{RemoteError, RemoteResult};
use crate::target_id::IdentifierError;

/// Errors that end a handler invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A control plane call failed.
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// The model lacks its primary identifier.
    #[error("{0} is required")]
    MissingIdentifier(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidRequest(String),

    /// The verb is not available for this resource type.
    #[error("{action} is not supported for {resource_type}")]
    Unsupported {
        action: &'static str,
        resource_type: &'static str,
    },

    /// A level scan did not terminate.
    #[error("ListLoggingLevels pagination did not terminate: {0}")]
    PaginationRunaway(String),
}

/// Result type for handler logic.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Attach the operation name to a control plane failure.
pub trait RemoteResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> RemoteResultExt<T> for RemoteResult<T> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|source| HandlerError::Remote { operation, source })
    }
}
