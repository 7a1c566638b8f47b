//! Handlers for each resource type.
//!
//! Each handler compares the desired model with what the control plane
//! reports and issues the calls needed for one verb. A handler invocation is a
//! single pass: it never retries and always ends in SUCCESS or FAILED.

pub mod destination;
pub mod logging;
pub mod target_logging;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HandlerError, Result};
use crate::outcome::Outcome;

pub use destination::TopicRuleDestinationHandler;
pub use logging::LoggingOptionsHandler;
pub use target_logging::TargetLogLevelHandler;

/// Verb requested by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "Create",
            Action::Read => "Read",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::List => "List",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to a handler invocation.
#[derive(Debug, Clone, Default)]
pub struct HandlerRequest<M> {
    pub desired: M,
    /// Account the orchestrator is acting for.
    pub account_id: Option<String>,
    /// Continuation token for List.
    pub next_token: Option<String>,
}

impl<M> HandlerRequest<M> {
    pub fn new(desired: M) -> Self {
        Self {
            desired,
            account_id: None,
            next_token: None,
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_next_token(mut self, next_token: Option<String>) -> Self {
        self.next_token = next_token;
        self
    }
}

/// The five verbs of a resource type.
///
/// Verbs a resource type does not support fail with `InvalidRequest` without
/// contacting the control plane.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    type Model: Clone + Send + Sync;

    /// Resource type name, e.g. `AWS::IoT::Logging`.
    const RESOURCE_TYPE: &'static str;

    async fn create(&self, _request: &HandlerRequest<Self::Model>) -> Outcome<Self::Model> {
        unsupported(Action::Create, Self::RESOURCE_TYPE)
    }

    async fn read(&self, _request: &HandlerRequest<Self::Model>) -> Outcome<Self::Model> {
        unsupported(Action::Read, Self::RESOURCE_TYPE)
    }

    async fn update(&self, _request: &HandlerRequest<Self::Model>) -> Outcome<Self::Model> {
        unsupported(Action::Update, Self::RESOURCE_TYPE)
    }

    async fn delete(&self, _request: &HandlerRequest<Self::Model>) -> Outcome<Self::Model> {
        unsupported(Action::Delete, Self::RESOURCE_TYPE)
    }

    async fn list(&self, _request: &HandlerRequest<Self::Model>) -> Outcome<Self::Model> {
        unsupported(Action::List, Self::RESOURCE_TYPE)
    }

    /// Route `action` to its verb.
    async fn handle(
        &self,
        action: Action,
        request: &HandlerRequest<Self::Model>,
    ) -> Outcome<Self::Model> {
        info!("Handling {} for {}", action, Self::RESOURCE_TYPE);
        let outcome = match action {
            Action::Create => self.create(request).await,
            Action::Read => self.read(request).await,
            Action::Update => self.update(request).await,
            Action::Delete => self.delete(request).await,
            Action::List => self.list(request).await,
        };
        info!(
            "{} for {} finished with {:?}",
            action,
            Self::RESOURCE_TYPE,
            outcome.status
        );
        outcome
    }
}

fn unsupported<M>(action: Action, resource_type: &'static str) -> Outcome<M> {
    HandlerError::Unsupported {
        action: action.as_str(),
        resource_type,
    }
    .into()
}

/// Collapse handler logic into an outcome, translating any failure.
pub(crate) fn finish<M>(result: Result<Outcome<M>>) -> Outcome<M> {
    result.unwrap_or_else(Outcome::from)
}
