//! Account logging options handler.
//!
//! The options are a singleton per account with no delete primitive:
//! "deleting" them sets `allLogsDisabled`. There is no Create; the options
//! come into existence through Update.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{finish, HandlerRequest, ResourceHandler};
use crate::clients::{LoggingClient, SetLoggingOptionsRequest};
use crate::error::{HandlerError, RemoteResultExt, Result};
use crate::model::LoggingOptions;
use crate::outcome::Outcome;

pub const RESOURCE_TYPE: &str = "AWS::IoT::Logging";

/// Message reported when the options are absent or disabled.
pub const DOES_NOT_EXIST: &str = "The loggingOptions for your account doesn't exist.";

/// Handler for `AWS::IoT::Logging`.
pub struct LoggingOptionsHandler {
    client: Arc<dyn LoggingClient>,
}

impl LoggingOptionsHandler {
    pub fn new(client: Arc<dyn LoggingClient>) -> Self {
        Self { client }
    }

    async fn read_options(&self, desired: &LoggingOptions) -> Result<Outcome<LoggingOptions>> {
        let account_id = require_account_id(desired)?;
        let current = self
            .client
            .get_logging_options()
            .await
            .during("GetLoggingOptions")?;
        if current.all_logs_disabled {
            return Err(HandlerError::NotFound(DOES_NOT_EXIST.to_string()));
        }

        Ok(Outcome::success(LoggingOptions {
            account_id: Some(account_id.to_string()),
            default_log_level: current.default_log_level,
            role_arn: current.role_arn,
            all_logs_disabled: false,
        }))
    }

    async fn update_options(&self, desired: &LoggingOptions) -> Result<Outcome<LoggingOptions>> {
        let account_id = require_account_id(desired)?;
        info!("Setting logging options for account {}", account_id);
        self.client
            .set_logging_options(SetLoggingOptionsRequest {
                default_log_level: desired.default_log_level.clone(),
                role_arn: desired.role_arn.clone(),
                all_logs_disabled: Some(desired.all_logs_disabled),
            })
            .await
            .during("SetLoggingOptions")?;
        Ok(Outcome::success(desired.clone()))
    }

    async fn disable_options(&self) -> Result<Outcome<LoggingOptions>> {
        let current = self
            .client
            .get_logging_options()
            .await
            .during("GetLoggingOptions")?;
        // Disabling twice surfaces as NotFound rather than success
        if current.all_logs_disabled {
            return Err(HandlerError::NotFound(DOES_NOT_EXIST.to_string()));
        }

        info!("Disabling all logs");
        self.client
            .set_logging_options(SetLoggingOptionsRequest {
                all_logs_disabled: Some(true),
                ..Default::default()
            })
            .await
            .during("SetLoggingOptions")?;
        Ok(Outcome::deleted())
    }

    async fn list_options(
        &self,
        request: &HandlerRequest<LoggingOptions>,
    ) -> Result<Outcome<LoggingOptions>> {
        let current = match self.client.get_logging_options().await {
            Err(e) if e.is_not_configured() => {
                info!("Logging options not configured, listing nothing");
                return Ok(Outcome::listed(vec![], None));
            }
            other => other.during("GetLoggingOptions")?,
        };
        if current.all_logs_disabled {
            return Ok(Outcome::listed(vec![], None));
        }

        let account_id = request
            .account_id
            .clone()
            .or_else(|| request.desired.account_id.clone());
        Ok(Outcome::listed(
            vec![LoggingOptions {
                account_id,
                default_log_level: current.default_log_level,
                role_arn: current.role_arn,
                all_logs_disabled: false,
            }],
            None,
        ))
    }
}

fn require_account_id(model: &LoggingOptions) -> Result<&str> {
    model
        .account_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(HandlerError::MissingIdentifier("AccountId"))
}

#[async_trait]
impl ResourceHandler for LoggingOptionsHandler {
    type Model = LoggingOptions;
    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;

    async fn read(&self, request: &HandlerRequest<LoggingOptions>) -> Outcome<LoggingOptions> {
        finish(self.read_options(&request.desired).await)
    }

    async fn update(&self, request: &HandlerRequest<LoggingOptions>) -> Outcome<LoggingOptions> {
        finish(self.update_options(&request.desired).await)
    }

    async fn delete(&self, _request: &HandlerRequest<LoggingOptions>) -> Outcome<LoggingOptions> {
        finish(self.disable_options().await)
    }

    async fn list(&self, request: &HandlerRequest<LoggingOptions>) -> Outcome<LoggingOptions> {
        finish(self.list_options(request).await)
    }
}
