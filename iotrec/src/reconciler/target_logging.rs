//! Per-target log level handler.
//!
//! Levels have no keyed read: existence is established by scanning the level
//! listing (see `lookup`). The primary identifier is `targetType:targetName`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{finish, HandlerRequest, ResourceHandler};
use crate::clients::LoggingClient;
use crate::config::LookupConfig;
use crate::error::{HandlerError, RemoteResultExt, Result};
use crate::lookup::find_log_level;
use crate::model::TargetLogLevel;
use crate::outcome::Outcome;
use crate::target_id;

pub const RESOURCE_TYPE: &str = "AWS::IoT::ResourceSpecificLogging";

/// Target type of the account-wide fallback entry; never listed as a resource.
pub const DEFAULT_TARGET_TYPE: &str = "default";

/// Handler for `AWS::IoT::ResourceSpecificLogging`.
pub struct TargetLogLevelHandler {
    client: Arc<dyn LoggingClient>,
    lookup: LookupConfig,
}

impl TargetLogLevelHandler {
    pub fn new(client: Arc<dyn LoggingClient>, lookup: LookupConfig) -> Self {
        Self { client, lookup }
    }

    async fn current_level(&self, target_type: &str, target_name: &str) -> Result<Option<String>> {
        find_log_level(self.client.as_ref(), &self.lookup, target_type, target_name).await
    }

    async fn create_level(&self, desired: &TargetLogLevel) -> Result<Outcome<TargetLogLevel>> {
        let (Some(target_type), Some(target_name), Some(log_level)) = (
            desired.target_type.as_deref(),
            desired.target_name.as_deref(),
            desired.log_level.as_deref(),
        ) else {
            return Err(HandlerError::InvalidRequest(
                "TargetType, TargetName and LogLevel are required".to_string(),
            ));
        };
        // The type must survive a round trip through the id
        if target_type.contains(target_id::SEPARATOR) {
            return Err(HandlerError::InvalidRequest(format!(
                "TargetType '{target_type}' must not contain '{}'",
                target_id::SEPARATOR
            )));
        }
        let id = target_id::build(target_type, target_name);

        if self.current_level(target_type, target_name).await?.is_some() {
            return Err(HandlerError::AlreadyExists(format!(
                "A log level for target {id} already exists."
            )));
        }

        info!("Setting log level {} for target {}", log_level, id);
        self.client
            .set_logging_level(target_type, target_name, log_level)
            .await
            .during("SetLoggingLevel")?;
        Ok(Outcome::success(TargetLogLevel::discovered(
            target_type,
            target_name,
            log_level,
        )))
    }

    async fn read_level(&self, desired: &TargetLogLevel) -> Result<Outcome<TargetLogLevel>> {
        let id = desired.id().ok_or(HandlerError::MissingIdentifier("TargetId"))?;
        let (target_type, target_name) = target_id::parse(id)?;

        match self.current_level(&target_type, &target_name).await? {
            Some(level) => Ok(Outcome::success(TargetLogLevel::discovered(
                &target_type,
                &target_name,
                &level,
            ))),
            None => Err(not_found(id)),
        }
    }

    async fn update_level(&self, desired: &TargetLogLevel) -> Result<Outcome<TargetLogLevel>> {
        let id = desired.id().ok_or(HandlerError::MissingIdentifier("TargetId"))?;
        let (target_type, target_name) = target_id::parse(id)?;
        let log_level = desired
            .log_level
            .as_deref()
            .ok_or_else(|| HandlerError::InvalidRequest("LogLevel is required".to_string()))?;

        if self.current_level(&target_type, &target_name).await?.is_none() {
            return Err(not_found(id));
        }

        info!("Updating log level for target {} to {}", id, log_level);
        self.client
            .set_logging_level(&target_type, &target_name, log_level)
            .await
            .during("SetLoggingLevel")?;
        Ok(Outcome::success(TargetLogLevel::discovered(
            &target_type,
            &target_name,
            log_level,
        )))
    }

    async fn list_levels(
        &self,
        request: &HandlerRequest<TargetLogLevel>,
    ) -> Result<Outcome<TargetLogLevel>> {
        let page = match self
            .client
            .list_logging_levels(request.next_token.as_deref(), self.lookup.page_size)
            .await
        {
            Err(e) if e.is_not_configured() => {
                info!("Logging not configured, listing no target levels: {}", e);
                return Ok(Outcome::listed(vec![], None));
            }
            other => other.during("ListLoggingLevels")?,
        };

        let models = page
            .entries
            .iter()
            .filter(|e| !e.target_type.eq_ignore_ascii_case(DEFAULT_TARGET_TYPE))
            .map(|e| TargetLogLevel::discovered(&e.target_type, &e.target_name, &e.log_level))
            .collect();
        Ok(Outcome::listed(models, page.next_token))
    }
}

fn not_found(id: &str) -> HandlerError {
    HandlerError::NotFound(format!("A log level for target {id} doesn't exist."))
}

#[async_trait]
impl ResourceHandler for TargetLogLevelHandler {
    type Model = TargetLogLevel;
    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;

    async fn create(&self, request: &HandlerRequest<TargetLogLevel>) -> Outcome<TargetLogLevel> {
        finish(self.create_level(&request.desired).await)
    }

    async fn read(&self, request: &HandlerRequest<TargetLogLevel>) -> Outcome<TargetLogLevel> {
        finish(self.read_level(&request.desired).await)
    }

    async fn update(&self, request: &HandlerRequest<TargetLogLevel>) -> Outcome<TargetLogLevel> {
        finish(self.update_level(&request.desired).await)
    }

    async fn list(&self, request: &HandlerRequest<TargetLogLevel>) -> Outcome<TargetLogLevel> {
        finish(self.list_levels(request).await)
    }
}
