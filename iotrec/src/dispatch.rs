//! Routing of orchestrator requests to resource handlers.
//!
//! A request is a JSON document naming the action and resource type with the
//! desired model. The dispatcher decodes the model for that type, runs the
//! handler and encodes the outcome. Handlers finish in a single pass, so the
//! previous state and callback context an orchestrator may send are ignored.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::clients::{DestinationClient, LoggingClient};
use crate::config::LookupConfig;
use crate::outcome::{HandlerErrorCode, Outcome};
use crate::reconciler::{
    destination, logging, target_logging, Action, HandlerRequest, LoggingOptionsHandler,
    ResourceHandler, TargetLogLevelHandler, TopicRuleDestinationHandler,
};

/// One orchestrator request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerInvocation {
    pub action: Action,
    pub resource_type: String,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub desired_resource_state: Value,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Holds one handler per resource type.
pub struct Dispatcher {
    logging: LoggingOptionsHandler,
    target_logging: TargetLogLevelHandler,
    destination: TopicRuleDestinationHandler,
}

impl Dispatcher {
    pub fn new(
        logging_client: Arc<dyn LoggingClient>,
        destination_client: Arc<dyn DestinationClient>,
        lookup: LookupConfig,
    ) -> Self {
        Self {
            logging: LoggingOptionsHandler::new(logging_client.clone()),
            target_logging: TargetLogLevelHandler::new(logging_client, lookup),
            destination: TopicRuleDestinationHandler::new(destination_client),
        }
    }

    /// Run `invocation` and return the encoded outcome.
    pub async fn dispatch(&self, invocation: HandlerInvocation) -> serde_json::Result<Value> {
        info!("Dispatching {} for {}", invocation.action, invocation.resource_type);
        match invocation.resource_type.as_str() {
            logging::RESOURCE_TYPE => run(&self.logging, invocation).await,
            target_logging::RESOURCE_TYPE => run(&self.target_logging, invocation).await,
            destination::RESOURCE_TYPE => run(&self.destination, invocation).await,
            other => {
                warn!("Unknown resource type {}", other);
                serde_json::to_value(Outcome::<Value>::failed(
                    HandlerErrorCode::InvalidRequest,
                    format!("Unsupported resource type {other}"),
                ))
            }
        }
    }
}

async fn run<H>(handler: &H, invocation: HandlerInvocation) -> serde_json::Result<Value>
where
    H: ResourceHandler,
    H::Model: Serialize + DeserializeOwned + Default,
{
    let request = match decode::<H::Model>(&invocation) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting undecodable {} model: {}", H::RESOURCE_TYPE, e);
            return serde_json::to_value(Outcome::<H::Model>::failed(
                HandlerErrorCode::InvalidRequest,
                format!("Invalid {} model: {e}", H::RESOURCE_TYPE),
            ));
        }
    };
    let outcome = handler.handle(invocation.action, &request).await;
    serde_json::to_value(outcome)
}

fn decode<M>(invocation: &HandlerInvocation) -> serde_json::Result<HandlerRequest<M>>
where
    M: DeserializeOwned + Default,
{
    Ok(HandlerRequest {
        desired: model_from(&invocation.desired_resource_state)?,
        account_id: invocation.aws_account_id.clone(),
        next_token: invocation.next_token.clone(),
    })
}

/// An absent desired state decodes to the empty model.
fn model_from<M: DeserializeOwned + Default>(value: &Value) -> serde_json::Result<M> {
    if value.is_null() {
        return Ok(M::default());
    }
    serde_json::from_value(value.clone())
}
