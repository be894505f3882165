//! Notification payload
//!
//! Reviewers receive a short summary of every matched state-change event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{DetailError, Event};

/// Payload published to the notification topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub model_identifier: String,
    pub approval_status: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Builds the payload from a matched event
    ///
    /// The identifier is the package ARN, falling back to the group name.
    /// The timestamp is the event time, or now when the producer sent none.
    pub fn from_event(event: &Event) -> Result<Self, DetailError> {
        let change = event.model_package_change()?;
        let model_identifier = change
            .identifier()
            .ok_or(DetailError::Missing("ModelPackageArn"))?
            .to_string();
        let approval_status = change.require_status()?.to_string();

        Ok(Self {
            model_identifier,
            approval_status,
            timestamp: event.time.unwrap_or_else(Utc::now),
        })
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "Model package {} is now {} (at {})",
            self.model_identifier,
            self.approval_status,
            self.timestamp.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_from_event() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let event = Event::new(
            "registry",
            "StateChange",
            json!({ "ModelPackageArn": "arn:1", "ModelApprovalStatus": "Approved" }),
        )
        .with_time(time);

        let notification = Notification::from_event(&event).unwrap();
        assert_eq!(notification.model_identifier, "arn:1");
        assert_eq!(notification.approval_status, "Approved");
        assert_eq!(notification.timestamp, time);

        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["modelIdentifier"], "arn:1");
        assert_eq!(value["approvalStatus"], "Approved");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_group_name_fallback() {
        let event = Event::new(
            "registry",
            "StateChange",
            json!({ "ModelPackageGroupName": "churn", "ModelApprovalStatus": "PendingManualApproval" }),
        );

        let notification = Notification::from_event(&event).unwrap();
        assert_eq!(notification.model_identifier, "churn");
        assert!(notification.summary().contains("churn is now PendingManualApproval"));
    }

    #[test]
    fn test_missing_identifier() {
        let event = Event::new(
            "registry",
            "StateChange",
            json!({ "ModelApprovalStatus": "Approved" }),
        );

        assert_eq!(
            Notification::from_event(&event),
            Err(DetailError::Missing("ModelPackageArn"))
        );
    }
}
