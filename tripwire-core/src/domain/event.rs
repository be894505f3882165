//! Event domain types
//!
//! An [`Event`] is the envelope delivered by the upstream event bus when a
//! model package changes state in the registry. The `detail` payload stays
//! loosely typed only until it crosses the trigger boundary, where it is
//! converted into a [`ModelPackageChange`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Inbound state-change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Delivery identifier assigned by the upstream bus, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Producer of the event (e.g. "aws.sagemaker")
    pub source: String,

    /// Kind of event (e.g. "SageMaker Model Package State Change")
    #[serde(rename = "detail-type", alias = "detailType")]
    pub detail_type: String,

    /// When the producer emitted the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Resource identifiers the event refers to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    /// Open payload; only pattern matching looks at it untyped
    #[serde(default)]
    pub detail: Map<String, Value>,
}

impl Event {
    /// Creates an event with the given source, detail type and detail object
    ///
    /// Non-object `detail` values are replaced by an empty map.
    pub fn new(source: impl Into<String>, detail_type: impl Into<String>, detail: Value) -> Self {
        let detail = match detail {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            id: None,
            source: source.into(),
            detail_type: detail_type.into(),
            time: None,
            account: None,
            region: None,
            resources: Vec::new(),
            detail,
        }
    }

    /// Sets the delivery identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the emission time
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Converts the detail payload into its typed form
    pub fn model_package_change(&self) -> Result<ModelPackageChange, DetailError> {
        serde_json::from_value(Value::Object(self.detail.clone()))
            .map_err(|e| DetailError::Invalid(e.to_string()))
    }
}

/// Approval status of a model package in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    PendingManualApproval,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::PendingManualApproval => "PendingManualApproval",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of a model package state-change detail
///
/// Every field is optional here; which ones are required depends on the
/// consumer (trigger rules may or may not need the group name).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelPackageChange {
    #[serde(default)]
    pub model_package_arn: Option<String>,

    #[serde(default)]
    pub model_package_group_name: Option<String>,

    #[serde(default)]
    pub model_approval_status: Option<ApprovalStatus>,
}

impl ModelPackageChange {
    /// Returns the package ARN or a `Missing` error
    pub fn require_arn(&self) -> Result<&str, DetailError> {
        non_empty(self.model_package_arn.as_deref()).ok_or(DetailError::Missing("ModelPackageArn"))
    }

    /// Returns the group name or a `Missing` error
    pub fn require_group_name(&self) -> Result<&str, DetailError> {
        non_empty(self.model_package_group_name.as_deref())
            .ok_or(DetailError::Missing("ModelPackageGroupName"))
    }

    /// Returns the approval status or a `Missing` error
    pub fn require_status(&self) -> Result<ApprovalStatus, DetailError> {
        self.model_approval_status
            .ok_or(DetailError::Missing("ModelApprovalStatus"))
    }

    /// Best identifier for humans: the package ARN, falling back to the group name
    pub fn identifier(&self) -> Option<&str> {
        non_empty(self.model_package_arn.as_deref())
            .or_else(|| non_empty(self.model_package_group_name.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Problems converting an event detail into typed fields
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetailError {
    /// A required field is absent or empty
    #[error("missing required detail field '{0}'")]
    Missing(&'static str),

    /// A field is present with the wrong type or an unknown value
    #[error("invalid event detail: {0}")]
    Invalid(String),
}
