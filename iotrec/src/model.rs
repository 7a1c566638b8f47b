//! Resource models exchanged with the orchestrator.
//!
//! Models use PascalCase property names on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::target_id;

/// Account-wide logging options. One per account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub all_logs_disabled: bool,
}

/// Log level override for a single target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetLogLevel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl TargetLogLevel {
    /// Model for a discovered target, with the id derived from its parts.
    pub fn discovered(target_type: &str, target_name: &str, log_level: &str) -> Self {
        Self {
            target_id: Some(target_id::build(target_type, target_name)),
            target_type: Some(target_type.to_string()),
            target_name: Some(target_name.to_string()),
            log_level: Some(log_level.to_string()),
        }
    }

    /// The identifier, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.target_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Lifecycle status of a topic rule destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DestinationStatus {
    Enabled,
    InProgress,
    Disabled,
    Error,
    Deleting,
}

impl DestinationStatus {
    /// Statuses a caller may request through an update.
    pub fn is_settable(self) -> bool {
        matches!(self, DestinationStatus::Enabled | DestinationStatus::Disabled)
    }
}

impl fmt::Display for DestinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DestinationStatus::Enabled => "ENABLED",
            DestinationStatus::InProgress => "IN_PROGRESS",
            DestinationStatus::Disabled => "DISABLED",
            DestinationStatus::Error => "ERROR",
            DestinationStatus::Deleting => "DELETING",
        };
        f.write_str(s)
    }
}

/// HTTP endpoint destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpUrlProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_url: Option<String>,
}

/// VPC destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcProperties {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

/// Where a destination delivers to. Exactly one kind per destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationProperties {
    HttpUrl(HttpUrlProperties),
    Vpc(VpcProperties),
}

impl DestinationProperties {
    pub fn kind(&self) -> &'static str {
        match self {
            DestinationProperties::HttpUrl(_) => "http",
            DestinationProperties::Vpc(_) => "vpc",
        }
    }
}

/// Topic rule destination, identified by its remote-assigned ARN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DestinationDocument", into = "DestinationDocument")]
pub struct TopicRuleDestination {
    pub arn: Option<String>,
    pub status: Option<DestinationStatus>,
    pub status_reason: Option<String>,
    pub properties: Option<DestinationProperties>,
}

impl TopicRuleDestination {
    /// The ARN, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.arn.as_deref().filter(|arn| !arn.is_empty())
    }
}

/// Rejected destination documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("HttpUrlProperties and VpcProperties are mutually exclusive")]
    ConflictingProperties,
}

/// Wire shape of a destination; the two property kinds are separate keys.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DestinationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<DestinationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_url_properties: Option<HttpUrlProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vpc_properties: Option<VpcProperties>,
}

impl TryFrom<DestinationDocument> for TopicRuleDestination {
    type Error = DocumentError;

    fn try_from(doc: DestinationDocument) -> Result<Self, Self::Error> {
        let properties = match (doc.http_url_properties, doc.vpc_properties) {
            (Some(_), Some(_)) => return Err(DocumentError::ConflictingProperties),
            (Some(http), None) => Some(DestinationProperties::HttpUrl(http)),
            (None, Some(vpc)) => Some(DestinationProperties::Vpc(vpc)),
            (None, None) => None,
        };
        Ok(Self {
            arn: doc.arn,
            status: doc.status,
            status_reason: doc.status_reason,
            properties,
        })
    }
}

impl From<TopicRuleDestination> for DestinationDocument {
    fn from(dest: TopicRuleDestination) -> Self {
        let (http_url_properties, vpc_properties) = match dest.properties {
            Some(DestinationProperties::HttpUrl(http)) => (Some(http), None),
            Some(DestinationProperties::Vpc(vpc)) => (None, Some(vpc)),
            None => (None, None),
        };
        Self {
            arn: dest.arn,
            status: dest.status,
            status_reason: dest.status_reason,
            http_url_properties,
            vpc_properties,
        }
    }
}
