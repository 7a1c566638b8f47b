//! Outcome envelope returned to the orchestrator for every handler call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal or in-flight status of a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Success,
    Failed,
    InProgress,
}

/// Canonical failure codes reported to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerErrorCode {
    InvalidRequest,
    AccessDenied,
    InternalFailure,
    Throttling,
    GeneralServiceException,
    NotFound,
    AlreadyExists,
    ResourceConflict,
}

impl HandlerErrorCode {
    /// Human-readable description used in outcome messages.
    pub fn description(self) -> &'static str {
        match self {
            HandlerErrorCode::InvalidRequest => "the request was rejected as invalid",
            HandlerErrorCode::AccessDenied => "access was denied",
            HandlerErrorCode::InternalFailure => "the service encountered an internal failure",
            HandlerErrorCode::Throttling => "the request was throttled",
            HandlerErrorCode::GeneralServiceException => {
                "the service returned an unexpected error"
            }
            HandlerErrorCode::NotFound => "the resource was not found",
            HandlerErrorCode::AlreadyExists => "the resource already exists",
            HandlerErrorCode::ResourceConflict => "a conflicting update is in progress",
        }
    }
}

/// Opaque state the orchestrator hands back on re-invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackContext(pub Map<String, Value>);

/// Result of one handler invocation.
///
/// Exactly one of `model` / `models` is set on success, depending on the verb.
/// Both are absent on failure and after a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<M> {
    pub status: OperationStatus,
    #[serde(
        rename = "resourceModel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<M>,
    #[serde(
        rename = "resourceModels",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub models: Option<Vec<M>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<HandlerErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_context: Option<CallbackContext>,
    #[serde(default)]
    pub callback_delay_seconds: u32,
}

impl<M> Outcome<M> {
    fn empty(status: OperationStatus) -> Self {
        Self {
            status,
            model: None,
            models: None,
            next_token: None,
            error_code: None,
            message: None,
            callback_context: None,
            callback_delay_seconds: 0,
        }
    }

    /// Success carrying a single model.
    pub fn success(model: M) -> Self {
        Self {
            model: Some(model),
            ..Self::empty(OperationStatus::Success)
        }
    }

    /// Success of a delete; no model is returned.
    pub fn deleted() -> Self {
        Self::empty(OperationStatus::Success)
    }

    /// Success of a list, with an optional continuation token.
    pub fn listed(models: Vec<M>, next_token: Option<String>) -> Self {
        Self {
            models: Some(models),
            next_token,
            ..Self::empty(OperationStatus::Success)
        }
    }

    /// Terminal failure.
    pub fn failed(code: HandlerErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code),
            message: Some(message.into()),
            ..Self::empty(OperationStatus::Failed)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}
