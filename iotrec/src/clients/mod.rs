//! Clients for the IoT control plane.
//!
//! The control plane is split into two API families, one trait each:
//! - `LoggingClient`: account logging options and per-target log levels
//! - `DestinationClient`: topic rule destinations
//!
//! Handlers receive the clients at construction. `memory::InMemoryIot`
//! implements both for tests and offline runs.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DestinationProperties, DestinationStatus};

pub use memory::InMemoryIot;

/// Upper bound the control plane accepts for `maxResults` on level listings.
pub const MAX_LOGGING_LEVELS_PAGE: u32 = 250;

/// Failure kinds raised by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    InvalidRequest,
    Unauthorized,
    Internal,
    InternalFailure,
    Throttling,
    ServiceUnavailable,
    NotConfigured,
    ResourceNotFound,
    ResourceAlreadyExists,
    ConflictingResourceUpdate,
    /// Any other exception, by name.
    Other(String),
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::InvalidRequest => f.write_str("InvalidRequestException"),
            RemoteErrorKind::Unauthorized => f.write_str("UnauthorizedException"),
            RemoteErrorKind::Internal => f.write_str("InternalException"),
            RemoteErrorKind::InternalFailure => f.write_str("InternalFailureException"),
            RemoteErrorKind::Throttling => f.write_str("ThrottlingException"),
            RemoteErrorKind::ServiceUnavailable => f.write_str("ServiceUnavailableException"),
            RemoteErrorKind::NotConfigured => f.write_str("NotConfiguredException"),
            RemoteErrorKind::ResourceNotFound => f.write_str("ResourceNotFoundException"),
            RemoteErrorKind::ResourceAlreadyExists => {
                f.write_str("ResourceAlreadyExistsException")
            }
            RemoteErrorKind::ConflictingResourceUpdate => {
                f.write_str("ConflictingResourceUpdateException")
            }
            RemoteErrorKind::Other(name) => f.write_str(name),
        }
    }
}

/// Error returned by a control plane call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_configured(&self) -> bool {
        self.kind == RemoteErrorKind::NotConfigured
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteErrorKind::ResourceNotFound
    }
}

/// Result type for control plane calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

// =============================================================================
// Logging DTOs
// =============================================================================

/// Account logging options as stored by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingOptionsState {
    pub default_log_level: Option<String>,
    pub role_arn: Option<String>,
    pub all_logs_disabled: bool,
}

/// Partial update of the account logging options. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetLoggingOptionsRequest {
    pub default_log_level: Option<String>,
    pub role_arn: Option<String>,
    pub all_logs_disabled: Option<bool>,
}

/// One entry of a level listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTargetEntry {
    pub target_type: String,
    pub target_name: String,
    pub log_level: String,
}

/// One page of a level listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingLevelsPage {
    pub entries: Vec<LogTargetEntry>,
    pub next_token: Option<String>,
}

// =============================================================================
// Destination DTOs
// =============================================================================

/// Topic rule destination as described by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationDescription {
    pub arn: String,
    pub status: DestinationStatus,
    pub status_reason: Option<String>,
    pub properties: DestinationProperties,
}

/// One page of a destination listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationsPage {
    pub summaries: Vec<DestinationDescription>,
    pub next_token: Option<String>,
}

// =============================================================================
// Client traits
// =============================================================================

/// Logging API of the control plane.
#[async_trait]
pub trait LoggingClient: Send + Sync {
    /// Fails with `NotConfigured` until options have been set once.
    async fn get_logging_options(&self) -> RemoteResult<LoggingOptionsState>;

    async fn set_logging_options(&self, request: SetLoggingOptionsRequest) -> RemoteResult<()>;

    /// List one page of per-target levels. `max_results` is capped at 250.
    async fn list_logging_levels(
        &self,
        next_token: Option<&str>,
        max_results: u32,
    ) -> RemoteResult<LoggingLevelsPage>;

    async fn set_logging_level(
        &self,
        target_type: &str,
        target_name: &str,
        log_level: &str,
    ) -> RemoteResult<()>;
}

/// Topic rule destination API of the control plane.
#[async_trait]
pub trait DestinationClient: Send + Sync {
    async fn create_destination(
        &self,
        properties: &DestinationProperties,
    ) -> RemoteResult<DestinationDescription>;

    async fn get_destination(&self, arn: &str) -> RemoteResult<DestinationDescription>;

    async fn update_destination(&self, arn: &str, status: DestinationStatus) -> RemoteResult<()>;

    async fn delete_destination(&self, arn: &str) -> RemoteResult<()>;

    async fn list_destinations(&self, next_token: Option<&str>) -> RemoteResult<DestinationsPage>;
}
