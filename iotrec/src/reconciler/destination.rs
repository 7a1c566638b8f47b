//! Topic rule destination handler.
//!
//! Destinations are the only kind with a keyed read and a real delete. The ARN
//! is assigned by the control plane on create; properties are create-only and
//! only the status can change afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{finish, HandlerRequest, ResourceHandler};
use crate::clients::{DestinationClient, DestinationDescription};
use crate::error::{HandlerError, RemoteResultExt, Result};
use crate::model::{DestinationStatus, TopicRuleDestination};
use crate::outcome::Outcome;

pub const RESOURCE_TYPE: &str = "AWS::IoT::TopicRuleDestination";

impl From<DestinationDescription> for TopicRuleDestination {
    fn from(desc: DestinationDescription) -> Self {
        Self {
            arn: Some(desc.arn),
            status: Some(desc.status),
            status_reason: desc.status_reason,
            properties: Some(desc.properties),
        }
    }
}

/// Handler for `AWS::IoT::TopicRuleDestination`.
pub struct TopicRuleDestinationHandler {
    client: Arc<dyn DestinationClient>,
}

impl TopicRuleDestinationHandler {
    pub fn new(client: Arc<dyn DestinationClient>) -> Self {
        Self { client }
    }

    async fn create_destination(
        &self,
        desired: &TopicRuleDestination,
    ) -> Result<Outcome<TopicRuleDestination>> {
        let properties = desired.properties.as_ref().ok_or_else(|| {
            HandlerError::InvalidRequest(
                "One of HttpUrlProperties or VpcProperties is required".to_string(),
            )
        })?;
        let wanted = settable_status(desired.status)?;

        let created = self
            .client
            .create_destination(properties)
            .await
            .during("CreateTopicRuleDestination")?;
        info!("Created topic rule destination {}", created.arn);

        let mut model = TopicRuleDestination::from(created);
        if let (Some(wanted), Some(current)) = (wanted, model.status) {
            if current.is_settable() && current != wanted {
                self.apply_status(&mut model, wanted).await?;
            }
        }
        Ok(Outcome::success(model))
    }

    async fn read_destination(
        &self,
        desired: &TopicRuleDestination,
    ) -> Result<Outcome<TopicRuleDestination>> {
        let arn = desired.id().ok_or(HandlerError::MissingIdentifier("Arn"))?;
        let current = self
            .client
            .get_destination(arn)
            .await
            .during("GetTopicRuleDestination")?;
        Ok(Outcome::success(current.into()))
    }

    async fn update_destination(
        &self,
        desired: &TopicRuleDestination,
    ) -> Result<Outcome<TopicRuleDestination>> {
        let arn = desired.id().ok_or(HandlerError::MissingIdentifier("Arn"))?;
        let wanted = settable_status(desired.status)?;

        let mut model = TopicRuleDestination::from(
            self.client
                .get_destination(arn)
                .await
                .during("GetTopicRuleDestination")?,
        );
        if desired.properties.is_some() && desired.properties != model.properties {
            return Err(HandlerError::InvalidRequest(
                "Destination properties cannot be changed after creation".to_string(),
            ));
        }

        match wanted {
            Some(wanted) if model.status != Some(wanted) => {
                self.apply_status(&mut model, wanted).await?;
            }
            _ => info!("Topic rule destination {} already up to date", arn),
        }
        Ok(Outcome::success(model))
    }

    async fn delete_destination(
        &self,
        desired: &TopicRuleDestination,
    ) -> Result<Outcome<TopicRuleDestination>> {
        let arn = desired.id().ok_or(HandlerError::MissingIdentifier("Arn"))?;
        match self.client.delete_destination(arn).await {
            Ok(()) => info!("Deleted topic rule destination {}", arn),
            Err(e) if e.is_not_found() => {
                warn!("Topic rule destination {} already gone: {}", arn, e);
            }
            Err(source) => {
                return Err(HandlerError::Remote {
                    operation: "DeleteTopicRuleDestination",
                    source,
                })
            }
        }
        Ok(Outcome::deleted())
    }

    async fn list_destinations(
        &self,
        request: &HandlerRequest<TopicRuleDestination>,
    ) -> Result<Outcome<TopicRuleDestination>> {
        let page = self
            .client
            .list_destinations(request.next_token.as_deref())
            .await
            .during("ListTopicRuleDestinations")?;
        let models = page.summaries.into_iter().map(Into::into).collect();
        Ok(Outcome::listed(models, page.next_token))
    }

    async fn apply_status(
        &self,
        model: &mut TopicRuleDestination,
        status: DestinationStatus,
    ) -> Result<()> {
        let arn = model.id().ok_or(HandlerError::MissingIdentifier("Arn"))?;
        info!("Setting topic rule destination {} to {}", arn, status);
        self.client
            .update_destination(arn, status)
            .await
            .during("UpdateTopicRuleDestination")?;
        model.status = Some(status);
        model.status_reason = None;
        Ok(())
    }
}

/// Only ENABLED and DISABLED may be requested.
fn settable_status(status: Option<DestinationStatus>) -> Result<Option<DestinationStatus>> {
    match status {
        Some(s) if !s.is_settable() => Err(HandlerError::InvalidRequest(format!(
            "Status {s} cannot be requested; use ENABLED or DISABLED"
        ))),
        other => Ok(other),
    }
}

#[async_trait]
impl ResourceHandler for TopicRuleDestinationHandler {
    type Model = TopicRuleDestination;
    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;

    async fn create(
        &self,
        request: &HandlerRequest<TopicRuleDestination>,
    ) -> Outcome<TopicRuleDestination> {
        finish(self.create_destination(&request.desired).await)
    }

    async fn read(
        &self,
        request: &HandlerRequest<TopicRuleDestination>,
    ) -> Outcome<TopicRuleDestination> {
        finish(self.read_destination(&request.desired).await)
    }

    async fn update(
        &self,
        request: &HandlerRequest<TopicRuleDestination>,
    ) -> Outcome<TopicRuleDestination> {
        finish(self.update_destination(&request.desired).await)
    }

    async fn delete(
        &self,
        request: &HandlerRequest<TopicRuleDestination>,
    ) -> Outcome<TopicRuleDestination> {
        finish(self.delete_destination(&request.desired).await)
    }

    async fn list(
        &self,
        request: &HandlerRequest<TopicRuleDestination>,
    ) -> Outcome<TopicRuleDestination> {
        finish(self.list_destinations(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::memory::RemoteCall;
    use crate::clients::{InMemoryIot, RemoteErrorKind};
    use crate::model::{DestinationProperties, HttpUrlProperties, VpcProperties};
    use crate::outcome::{HandlerErrorCode, OperationStatus};

    fn control_plane() -> Arc<InMemoryIot> {
        Arc::new(InMemoryIot::new("us-east-1", "123456789012"))
    }

    fn http(url: &str) -> DestinationProperties {
        DestinationProperties::HttpUrl(HttpUrlProperties {
            confirmation_url: Some(url.to_string()),
        })
    }

    fn vpc() -> DestinationProperties {
        DestinationProperties::Vpc(VpcProperties {
            subnet_ids: vec!["subnet-1".to_string()],
            security_groups: vec!["sg-1".to_string()],
            vpc_id: Some("vpc-1".to_string()),
            role_arn: Some("arn:aws:iam::123456789012:role/dest".to_string()),
        })
    }

    fn with_properties(
        properties: DestinationProperties,
        status: Option<DestinationStatus>,
    ) -> TopicRuleDestination {
        TopicRuleDestination {
            status,
            properties: Some(properties),
            ..Default::default()
        }
    }

    fn by_arn(arn: &str, status: Option<DestinationStatus>) -> TopicRuleDestination {
        TopicRuleDestination {
            arn: Some(arn.to_string()),
            status,
            ..Default::default()
        }
    }

    async fn created(handler: &TopicRuleDestinationHandler, model: TopicRuleDestination) -> String {
        let outcome = handler.create(&HandlerRequest::new(model)).await;
        assert_eq!(outcome.status, OperationStatus::Success);
        outcome.model.unwrap().arn.unwrap()
    }

    #[tokio::test]
    async fn test_create_http_destination_pending_confirmation() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());

        let outcome = handler
            .create(&HandlerRequest::new(with_properties(
                http("https://example.com/confirm"),
                Some(DestinationStatus::Enabled),
            )))
            .await;
        assert_eq!(outcome.status, OperationStatus::Success);
        let model = outcome.model.unwrap();
        assert!(model.id().unwrap().contains(":ruledestination/http/"));
        // Awaiting confirmation, so no status update is attempted
        assert_eq!(model.status, Some(DestinationStatus::InProgress));
        assert_eq!(iot.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_vpc_destination_disabled() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());

        let outcome = handler
            .create(&HandlerRequest::new(with_properties(
                vpc(),
                Some(DestinationStatus::Disabled),
            )))
            .await;
        let model = outcome.model.unwrap();
        assert_eq!(model.status, Some(DestinationStatus::Disabled));

        let arn = model.arn.unwrap();
        assert_eq!(
            iot.calls().await,
            vec![
                RemoteCall::CreateDestination { kind: "vpc" },
                RemoteCall::UpdateDestination {
                    arn: arn.clone(),
                    status: DestinationStatus::Disabled,
                },
            ]
        );
        assert_eq!(
            iot.snapshot().await.destinations[0].status,
            DestinationStatus::Disabled
        );
    }

    #[tokio::test]
    async fn test_create_validates_before_calling() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());

        let outcome = handler
            .create(&HandlerRequest::new(TopicRuleDestination::default()))
            .await;
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::InvalidRequest));

        let outcome = handler
            .create(&HandlerRequest::new(with_properties(
                vpc(),
                Some(DestinationStatus::Deleting),
            )))
            .await;
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::InvalidRequest));
        assert!(iot.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_url_already_exists() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());
        created(&handler, with_properties(http("https://dup.example.com"), None)).await;

        let outcome = handler
            .create(&HandlerRequest::new(with_properties(
                http("https://dup.example.com"),
                None,
            )))
            .await;
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::AlreadyExists));
        assert_eq!(
            outcome.message.as_deref(),
            Some("CreateTopicRuleDestination failed: the resource already exists")
        );
    }

    #[tokio::test]
    async fn test_read_returns_remote_description() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());
        let arn = created(&handler, with_properties(vpc(), None)).await;

        let outcome = handler.read(&HandlerRequest::new(by_arn(&arn, None))).await;
        let model = outcome.model.unwrap();
        assert_eq!(model.status, Some(DestinationStatus::Enabled));
        assert_eq!(model.properties, Some(vpc()));

        let outcome = handler
            .read(&HandlerRequest::new(TopicRuleDestination::default()))
            .await;
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::NotFound));
    }

    #[tokio::test]
    async fn test_update_toggles_status() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());
        let arn = created(&handler, with_properties(http("https://a.example.com"), None)).await;
        iot.confirm_destination(&arn).await.unwrap();

        let outcome = handler
            .update(&HandlerRequest::new(by_arn(&arn, Some(DestinationStatus::Disabled))))
            .await;
        assert_eq!(outcome.status, OperationStatus::Success);
        assert_eq!(
            outcome.model.unwrap().status,
            Some(DestinationStatus::Disabled)
        );

        // Same status again issues no update
        let before = iot.calls().await.len();
        handler
            .update(&HandlerRequest::new(by_arn(&arn, Some(DestinationStatus::Disabled))))
            .await;
        let calls = iot.calls().await;
        assert_eq!(calls.len(), before + 1);
        assert_eq!(calls.last(), Some(&RemoteCall::GetDestination(arn)));
    }

    #[tokio::test]
    async fn test_update_rejects_property_change() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());
        let arn = created(&handler, with_properties(http("https://a.example.com"), None)).await;

        let mut desired = by_arn(&arn, Some(DestinationStatus::Enabled));
        desired.properties = Some(http("https://b.example.com"));
        let outcome = handler.update(&HandlerRequest::new(desired)).await;
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::InvalidRequest));
        assert!(!iot
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, RemoteCall::UpdateDestination { .. })));
    }

    #[tokio::test]
    async fn test_update_unknown_arn_not_found() {
        let handler = TopicRuleDestinationHandler::new(control_plane());
        let outcome = handler
            .update(&HandlerRequest::new(by_arn(
                "arn:aws:iot:us-east-1:123456789012:ruledestination/vpc/gone",
                Some(DestinationStatus::Enabled),
            )))
            .await;
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::NotFound));
    }

    #[tokio::test]
    async fn test_delete_missing_destination_is_success() {
        let iot = control_plane();
        let handler = TopicRuleDestinationHandler::new(iot.clone());
        let arn = created(&handler, with_properties(vpc(), None)).await;

        let first = handler.delete(&HandlerRequest::new(by_arn(&arn, None))).await;
        assert_eq!(first.status, OperationStatus::Success);
        assert!(first.model.is_none());

        let second = handler.delete(&HandlerRequest::new(by_arn(&arn, None))).await;
        assert_eq!(second.status, OperationStatus::Success);
        assert!(second.error_code.is_none());
    }

    #[tokio::test]
    async fn test_delete_propagates_other_failures() {
        let iot = control_plane();
        iot.inject_fault(Some(RemoteErrorKind::ConflictingResourceUpdate))
            .await;
        let handler = TopicRuleDestinationHandler::new(iot);
        let outcome = handler
            .delete(&HandlerRequest::new(by_arn("arn:x", None)))
            .await;
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::ResourceConflict));
    }

    #[tokio::test]
    async fn test_list_maps_summaries_and_token() {
        let iot = Arc::new(InMemoryIot::new("us-east-1", "123456789012").with_page_size(1));
        let handler = TopicRuleDestinationHandler::new(iot.clone());
        created(&handler, with_properties(vpc(), None)).await;
        created(&handler, with_properties(http("https://a.example.com"), None)).await;

        let first = handler
            .list(&HandlerRequest::new(TopicRuleDestination::default()))
            .await;
        let models = first.models.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].properties, Some(vpc()));
        assert_eq!(first.next_token.as_deref(), Some("1"));

        let second = handler
            .list(
                &HandlerRequest::new(TopicRuleDestination::default())
                    .with_next_token(first.next_token),
            )
            .await;
        assert_eq!(second.models.unwrap()[0].status, Some(DestinationStatus::InProgress));
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_list_failure_is_not_swallowed() {
        let iot = control_plane();
        iot.inject_fault(Some(RemoteErrorKind::NotConfigured)).await;
        let handler = TopicRuleDestinationHandler::new(iot);
        let outcome = handler
            .list(&HandlerRequest::new(TopicRuleDestination::default()))
            .await;
        assert_eq!(outcome.status, OperationStatus::Failed);
        assert_eq!(outcome.error_code, Some(HandlerErrorCode::NotFound));
        assert!(outcome.models.is_none());
    }
}
