//! In-process control plane.
//!
//! Implements both client traits over local state so handlers can run without
//! a remote endpoint. Every call is recorded, and a fault can be injected to
//! make all subsequent calls fail with a given kind.

use std::cmp::min;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::debug;

use super::{
    DestinationClient, DestinationDescription, DestinationsPage, LogTargetEntry, LoggingClient,
    LoggingLevelsPage, LoggingOptionsState, RemoteError, RemoteErrorKind, RemoteResult,
    SetLoggingOptionsRequest, MAX_LOGGING_LEVELS_PAGE,
};
use crate::model::{DestinationProperties, DestinationStatus};

/// Default number of entries returned per listing page.
pub const DEFAULT_PAGE_SIZE: usize = MAX_LOGGING_LEVELS_PAGE as usize;

/// A control plane call, as observed by the in-memory implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    GetLoggingOptions,
    SetLoggingOptions(SetLoggingOptionsRequest),
    ListLoggingLevels {
        next_token: Option<String>,
        max_results: u32,
    },
    SetLoggingLevel {
        target_type: String,
        target_name: String,
        log_level: String,
    },
    CreateDestination {
        kind: &'static str,
    },
    GetDestination(String),
    UpdateDestination {
        arn: String,
        status: DestinationStatus,
    },
    DeleteDestination(String),
    ListDestinations {
        next_token: Option<String>,
    },
}

/// Persistable contents of the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPlaneSnapshot {
    #[serde(default)]
    pub logging_options: Option<LoggingOptionsState>,
    #[serde(default)]
    pub logging_levels: Vec<LogTargetEntry>,
    #[serde(default)]
    pub destinations: Vec<DestinationDescription>,
}

/// Errors reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid snapshot document: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControlPlaneSnapshot {
    /// Load a snapshot from `path`. A missing file is an empty control plane.
    pub async fn load(path: &Path) -> Result<Self, SnapshotError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No snapshot at {}, starting empty", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

struct ControlPlane {
    data: ControlPlaneSnapshot,
    fault: Option<RemoteErrorKind>,
    calls: Vec<RemoteCall>,
}

/// In-memory IoT control plane.
pub struct InMemoryIot {
    region: String,
    account_id: String,
    page_size: usize,
    state: RwLock<ControlPlane>,
}

impl InMemoryIot {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self::from_snapshot(region, account_id, ControlPlaneSnapshot::default())
    }

    pub fn from_snapshot(
        region: impl Into<String>,
        account_id: impl Into<String>,
        snapshot: ControlPlaneSnapshot,
    ) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
            state: RwLock::new(ControlPlane {
                data: snapshot,
                fault: None,
                calls: Vec::new(),
            }),
        }
    }

    /// Serve listings in pages of at most `page_size` entries.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every following call fail with `kind`, or clear the fault.
    pub async fn inject_fault(&self, kind: Option<RemoteErrorKind>) {
        self.state.write().await.fault = kind;
    }

    /// Calls received so far, in order.
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn snapshot(&self) -> ControlPlaneSnapshot {
        self.state.read().await.data.clone()
    }

    /// Mark a pending HTTP destination as confirmed by its endpoint.
    pub async fn confirm_destination(&self, arn: &str) -> RemoteResult<()> {
        let mut state = self.state.write().await;
        let dest = state
            .data
            .destinations
            .iter_mut()
            .find(|d| d.arn == arn)
            .ok_or_else(|| destination_not_found(arn))?;
        if dest.status == DestinationStatus::InProgress {
            dest.status = DestinationStatus::Enabled;
            dest.status_reason = None;
        }
        Ok(())
    }

    /// Record the call and apply any injected fault.
    async fn begin(&self, call: RemoteCall) -> RemoteResult<RwLockWriteGuard<'_, ControlPlane>> {
        debug!("Control plane call: {:?}", call);
        let mut state = self.state.write().await;
        state.calls.push(call);
        if let Some(kind) = state.fault.clone() {
            return Err(RemoteError::new(kind, "injected fault"));
        }
        Ok(state)
    }

    fn destination_arn(&self, kind: &str) -> String {
        format!(
            "arn:aws:iot:{}:{}:ruledestination/{}/{}",
            self.region,
            self.account_id,
            kind,
            uuid::Uuid::new_v4()
        )
    }
}

fn not_configured() -> RemoteError {
    RemoteError::new(
        RemoteErrorKind::NotConfigured,
        "Logging options are not configured for this account",
    )
}

fn destination_not_found(arn: &str) -> RemoteError {
    RemoteError::new(
        RemoteErrorKind::ResourceNotFound,
        format!("Topic rule destination {arn} does not exist"),
    )
}

/// Slice `items` at the offset encoded in `token`.
fn page_of<T: Clone>(
    items: &[T],
    token: Option<&str>,
    limit: usize,
) -> RemoteResult<(Vec<T>, Option<String>)> {
    let start = match token {
        None => 0,
        Some(t) => t
            .parse::<usize>()
            .ok()
            .filter(|offset| *offset <= items.len())
            .ok_or_else(|| {
                RemoteError::new(
                    RemoteErrorKind::InvalidRequest,
                    format!("Invalid pagination token: {t}"),
                )
            })?,
    };
    let end = min(start + limit, items.len());
    let page = items[start..end].to_vec();
    let next = (end < items.len()).then(|| end.to_string());
    Ok((page, next))
}

#[async_trait]
impl LoggingClient for InMemoryIot {
    async fn get_logging_options(&self) -> RemoteResult<LoggingOptionsState> {
        let state = self.begin(RemoteCall::GetLoggingOptions).await?;
        state.data.logging_options.clone().ok_or_else(not_configured)
    }

    async fn set_logging_options(&self, request: SetLoggingOptionsRequest) -> RemoteResult<()> {
        let mut state = self
            .begin(RemoteCall::SetLoggingOptions(request.clone()))
            .await?;
        let current = state.data.logging_options.get_or_insert_with(Default::default);
        if let Some(level) = request.default_log_level {
            current.default_log_level = Some(level);
        }
        if let Some(role) = request.role_arn {
            current.role_arn = Some(role);
        }
        if let Some(disabled) = request.all_logs_disabled {
            current.all_logs_disabled = disabled;
        }
        Ok(())
    }

    async fn list_logging_levels(
        &self,
        next_token: Option<&str>,
        max_results: u32,
    ) -> RemoteResult<LoggingLevelsPage> {
        let state = self
            .begin(RemoteCall::ListLoggingLevels {
                next_token: next_token.map(str::to_string),
                max_results,
            })
            .await?;
        if state.data.logging_options.is_none() {
            return Err(not_configured());
        }
        if max_results == 0 || max_results > MAX_LOGGING_LEVELS_PAGE {
            return Err(RemoteError::new(
                RemoteErrorKind::InvalidRequest,
                format!("maxResults must be between 1 and {MAX_LOGGING_LEVELS_PAGE}"),
            ));
        }

        let limit = min(max_results as usize, self.page_size);
        let (entries, next_token) = page_of(&state.data.logging_levels, next_token, limit)?;
        Ok(LoggingLevelsPage {
            entries,
            next_token,
        })
    }

    async fn set_logging_level(
        &self,
        target_type: &str,
        target_name: &str,
        log_level: &str,
    ) -> RemoteResult<()> {
        let mut state = self
            .begin(RemoteCall::SetLoggingLevel {
                target_type: target_type.to_string(),
                target_name: target_name.to_string(),
                log_level: log_level.to_string(),
            })
            .await?;
        if state.data.logging_options.is_none() {
            return Err(not_configured());
        }

        let levels = &mut state.data.logging_levels;
        match levels
            .iter_mut()
            .find(|e| e.target_type == target_type && e.target_name == target_name)
        {
            Some(entry) => entry.log_level = log_level.to_string(),
            None => levels.push(LogTargetEntry {
                target_type: target_type.to_string(),
                target_name: target_name.to_string(),
                log_level: log_level.to_string(),
            }),
        }
        Ok(())
    }
}

#[async_trait]
impl DestinationClient for InMemoryIot {
    async fn create_destination(
        &self,
        properties: &DestinationProperties,
    ) -> RemoteResult<DestinationDescription> {
        let mut state = self
            .begin(RemoteCall::CreateDestination {
                kind: properties.kind(),
            })
            .await?;

        let status = match properties {
            DestinationProperties::HttpUrl(http) => {
                let url = http.confirmation_url.as_deref().unwrap_or_default();
                if url.is_empty() {
                    return Err(RemoteError::new(
                        RemoteErrorKind::InvalidRequest,
                        "confirmationUrl is required",
                    ));
                }
                let duplicate = state.data.destinations.iter().any(|d| {
                    matches!(&d.properties, DestinationProperties::HttpUrl(h)
                        if h.confirmation_url.as_deref() == Some(url))
                });
                if duplicate {
                    return Err(RemoteError::new(
                        RemoteErrorKind::ResourceAlreadyExists,
                        format!("A destination for {url} already exists"),
                    ));
                }
                // HTTP endpoints must confirm before the destination is enabled
                DestinationStatus::InProgress
            }
            DestinationProperties::Vpc(vpc) => {
                if vpc.vpc_id.is_none() || vpc.role_arn.is_none() || vpc.subnet_ids.is_empty() {
                    return Err(RemoteError::new(
                        RemoteErrorKind::InvalidRequest,
                        "vpcId, roleArn and subnetIds are required",
                    ));
                }
                DestinationStatus::Enabled
            }
        };

        let dest = DestinationDescription {
            arn: self.destination_arn(properties.kind()),
            status,
            status_reason: (status == DestinationStatus::InProgress)
                .then(|| "Awaiting endpoint confirmation".to_string()),
            properties: properties.clone(),
        };
        state.data.destinations.push(dest.clone());
        Ok(dest)
    }

    async fn get_destination(&self, arn: &str) -> RemoteResult<DestinationDescription> {
        let state = self.begin(RemoteCall::GetDestination(arn.to_string())).await?;
        state
            .data
            .destinations
            .iter()
            .find(|d| d.arn == arn)
            .cloned()
            .ok_or_else(|| destination_not_found(arn))
    }

    async fn update_destination(&self, arn: &str, status: DestinationStatus) -> RemoteResult<()> {
        let mut state = self
            .begin(RemoteCall::UpdateDestination {
                arn: arn.to_string(),
                status,
            })
            .await?;
        if !status.is_settable() {
            return Err(RemoteError::new(
                RemoteErrorKind::InvalidRequest,
                format!("Status {status} cannot be set"),
            ));
        }

        let dest = state
            .data
            .destinations
            .iter_mut()
            .find(|d| d.arn == arn)
            .ok_or_else(|| destination_not_found(arn))?;
        match dest.status {
            DestinationStatus::InProgress => Err(RemoteError::new(
                RemoteErrorKind::InvalidRequest,
                format!("Destination {arn} has not been confirmed"),
            )),
            DestinationStatus::Deleting => Err(RemoteError::new(
                RemoteErrorKind::ConflictingResourceUpdate,
                format!("Destination {arn} is being deleted"),
            )),
            _ => {
                dest.status = status;
                dest.status_reason = None;
                Ok(())
            }
        }
    }

    async fn delete_destination(&self, arn: &str) -> RemoteResult<()> {
        let mut state = self
            .begin(RemoteCall::DeleteDestination(arn.to_string()))
            .await?;
        let before = state.data.destinations.len();
        state.data.destinations.retain(|d| d.arn != arn);
        if state.data.destinations.len() == before {
            return Err(destination_not_found(arn));
        }
        Ok(())
    }

    async fn list_destinations(&self, next_token: Option<&str>) -> RemoteResult<DestinationsPage> {
        let state = self
            .begin(RemoteCall::ListDestinations {
                next_token: next_token.map(str::to_string),
            })
            .await?;
        let (summaries, next_token) =
            page_of(&state.data.destinations, next_token, self.page_size)?;
        Ok(DestinationsPage {
            summaries,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpUrlProperties, VpcProperties};

    fn configured(levels: Vec<LogTargetEntry>) -> ControlPlaneSnapshot {
        ControlPlaneSnapshot {
            logging_options: Some(LoggingOptionsState {
                default_log_level: Some("ERROR".to_string()),
                role_arn: Some("role".to_string()),
                all_logs_disabled: false,
            }),
            logging_levels: levels,
            destinations: vec![],
        }
    }

    fn entry(target_type: &str, target_name: &str, level: &str) -> LogTargetEntry {
        LogTargetEntry {
            target_type: target_type.to_string(),
            target_name: target_name.to_string(),
            log_level: level.to_string(),
        }
    }

    #[tokio::test]
    async fn test_logging_options_not_configured_until_set() {
        let iot = InMemoryIot::new("us-east-1", "123456789012");

        let err = iot.get_logging_options().await.unwrap_err();
        assert!(err.is_not_configured());

        iot.set_logging_options(SetLoggingOptionsRequest {
            default_log_level: Some("INFO".to_string()),
            role_arn: Some("role".to_string()),
            all_logs_disabled: None,
        })
        .await
        .unwrap();

        let opts = iot.get_logging_options().await.unwrap();
        assert_eq!(opts.default_log_level.as_deref(), Some("INFO"));
        assert!(!opts.all_logs_disabled);

        // Partial set keeps the other fields
        iot.set_logging_options(SetLoggingOptionsRequest {
            all_logs_disabled: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
        let opts = iot.get_logging_options().await.unwrap();
        assert!(opts.all_logs_disabled);
        assert_eq!(opts.role_arn.as_deref(), Some("role"));
    }

    #[tokio::test]
    async fn test_list_logging_levels_pages() {
        let levels = (0..5)
            .map(|i| entry("THING_GROUP", &format!("group-{i}"), "INFO"))
            .collect();
        let iot =
            InMemoryIot::from_snapshot("us-east-1", "123", configured(levels)).with_page_size(2);

        let first = iot.list_logging_levels(None, 250).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let second = iot
            .list_logging_levels(first.next_token.as_deref(), 250)
            .await
            .unwrap();
        assert_eq!(second.entries[0].target_name, "group-2");

        let last = iot.list_logging_levels(Some("4"), 250).await.unwrap();
        assert_eq!(last.entries.len(), 1);
        assert!(last.next_token.is_none());

        let err = iot.list_logging_levels(Some("bogus"), 250).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidRequest);

        let err = iot.list_logging_levels(None, 251).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_set_logging_level_upserts() {
        let iot = InMemoryIot::from_snapshot("us-east-1", "123", configured(vec![]));
        iot.set_logging_level("CLIENT_ID", "a:b", "INFO").await.unwrap();
        iot.set_logging_level("CLIENT_ID", "a:b", "DEBUG").await.unwrap();

        let page = iot.list_logging_levels(None, 250).await.unwrap();
        assert_eq!(page.entries, vec![entry("CLIENT_ID", "a:b", "DEBUG")]);
    }

    #[tokio::test]
    async fn test_set_logging_level_requires_configuration() {
        let iot = InMemoryIot::new("us-east-1", "123");
        let err = iot
            .set_logging_level("CLIENT_ID", "x", "INFO")
            .await
            .unwrap_err();
        assert!(err.is_not_configured());
    }

    #[tokio::test]
    async fn test_fault_injection_records_call() {
        let iot = InMemoryIot::from_snapshot("us-east-1", "123", configured(vec![]));
        iot.inject_fault(Some(RemoteErrorKind::Throttling)).await;

        let err = iot.get_logging_options().await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Throttling);
        assert_eq!(iot.calls().await, vec![RemoteCall::GetLoggingOptions]);

        iot.inject_fault(None).await;
        assert!(iot.get_logging_options().await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        // Missing file starts empty
        let empty = ControlPlaneSnapshot::load(&path).await.unwrap();
        assert_eq!(empty, ControlPlaneSnapshot::default());

        let iot = InMemoryIot::from_snapshot(
            "us-east-1",
            "123",
            configured(vec![entry("CLIENT_ID", "a", "WARN")]),
        );
        iot.snapshot().await.save(&path).await.unwrap();

        let loaded = ControlPlaneSnapshot::load(&path).await.unwrap();
        assert_eq!(loaded, iot.snapshot().await);
    }

    #[tokio::test]
    async fn test_snapshot_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let err = ControlPlaneSnapshot::load(&path).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Json(_)));
    }

    #[tokio::test]
    async fn test_destination_lifecycle() {
        let iot = InMemoryIot::new("eu-west-1", "123456789012");
        let http = DestinationProperties::HttpUrl(HttpUrlProperties {
            confirmation_url: Some("https://example.com/confirm".to_string()),
        });

        let created = iot.create_destination(&http).await.unwrap();
        assert!(created
            .arn
            .starts_with("arn:aws:iot:eu-west-1:123456789012:ruledestination/http/"));
        assert_eq!(created.status, DestinationStatus::InProgress);

        // Duplicate confirmation URL
        let err = iot.create_destination(&http).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::ResourceAlreadyExists);

        // Unconfirmed destinations cannot be enabled
        let err = iot
            .update_destination(&created.arn, DestinationStatus::Enabled)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidRequest);

        iot.confirm_destination(&created.arn).await.unwrap();
        iot.update_destination(&created.arn, DestinationStatus::Disabled)
            .await
            .unwrap();
        let fetched = iot.get_destination(&created.arn).await.unwrap();
        assert_eq!(fetched.status, DestinationStatus::Disabled);

        iot.delete_destination(&created.arn).await.unwrap();
        let err = iot.delete_destination(&created.arn).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(iot.get_destination(&created.arn).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_vpc_destination_validation() {
        let iot = InMemoryIot::new("eu-west-1", "123456789012");
        let incomplete = DestinationProperties::Vpc(VpcProperties {
            vpc_id: Some("vpc-1".to_string()),
            ..Default::default()
        });
        let err = iot.create_destination(&incomplete).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidRequest);

        let complete = DestinationProperties::Vpc(VpcProperties {
            subnet_ids: vec!["subnet-1".to_string()],
            security_groups: vec![],
            vpc_id: Some("vpc-1".to_string()),
            role_arn: Some("arn:aws:iam::123456789012:role/dest".to_string()),
        });
        let created = iot.create_destination(&complete).await.unwrap();
        assert_eq!(created.status, DestinationStatus::Enabled);

        let page = iot.list_destinations(None).await.unwrap();
        assert_eq!(page.summaries.len(), 1);
        assert!(page.next_token.is_none());
    }
}
