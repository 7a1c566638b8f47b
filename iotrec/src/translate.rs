//! Translation of handler failures into outcome codes.
//!
//! This is the only place that inspects control plane exception kinds. The
//! remote's own message is logged but never copied into the outcome.

use tracing::warn;

use crate::clients::RemoteErrorKind;
use crate::error::HandlerError;
use crate::outcome::{HandlerErrorCode, Outcome};

/// Map a control plane exception kind to its outcome code.
pub fn error_code(kind: &RemoteErrorKind) -> HandlerErrorCode {
    match kind {
        RemoteErrorKind::InvalidRequest => HandlerErrorCode::InvalidRequest,
        RemoteErrorKind::Unauthorized => HandlerErrorCode::AccessDenied,
        RemoteErrorKind::Internal | RemoteErrorKind::InternalFailure => {
            HandlerErrorCode::InternalFailure
        }
        RemoteErrorKind::Throttling => HandlerErrorCode::Throttling,
        RemoteErrorKind::ServiceUnavailable => HandlerErrorCode::GeneralServiceException,
        RemoteErrorKind::NotConfigured | RemoteErrorKind::ResourceNotFound => {
            HandlerErrorCode::NotFound
        }
        RemoteErrorKind::ResourceAlreadyExists => HandlerErrorCode::AlreadyExists,
        RemoteErrorKind::ConflictingResourceUpdate => HandlerErrorCode::ResourceConflict,
        RemoteErrorKind::Other(_) => HandlerErrorCode::GeneralServiceException,
    }
}

/// Outcome code for any handler failure.
pub fn translate(err: &HandlerError) -> HandlerErrorCode {
    match err {
        HandlerError::Remote { source, .. } => error_code(&source.kind),
        HandlerError::Identifier(_) => HandlerErrorCode::InvalidRequest,
        HandlerError::MissingIdentifier(_) => HandlerErrorCode::NotFound,
        HandlerError::NotFound(_) => HandlerErrorCode::NotFound,
        HandlerError::AlreadyExists(_) => HandlerErrorCode::AlreadyExists,
        HandlerError::InvalidRequest(_) => HandlerErrorCode::InvalidRequest,
        HandlerError::Unsupported { .. } => HandlerErrorCode::InvalidRequest,
        HandlerError::PaginationRunaway(_) => HandlerErrorCode::GeneralServiceException,
    }
}

/// User-facing message for a handler failure.
fn message(err: &HandlerError, code: HandlerErrorCode) -> String {
    match err {
        HandlerError::Remote { operation, .. } => {
            format!("{operation} failed: {}", code.description())
        }
        other => other.to_string(),
    }
}

impl<M> From<HandlerError> for Outcome<M> {
    fn from(err: HandlerError) -> Self {
        let code = translate(&err);
        if let HandlerError::Remote { operation, source } = &err {
            warn!("{} failed with {}, reporting {:?}", operation, source, code);
        }
        Outcome::failed(code, message(&err, code))
    }
}
