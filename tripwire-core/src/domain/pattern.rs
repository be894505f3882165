//! Event filter
//!
//! A declarative [`EventPattern`] decides whether an inbound [`Event`] is
//! relevant. Matching is strict AND: every configured field must be present
//! in the event and carry one of the allowed values. Unconfigured fields are
//! unconstrained, so an empty pattern matches everything.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::event::Event;

/// Declarative predicate over an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPattern {
    /// Allowed values for `source`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,

    /// Allowed values for `detail-type`
    #[serde(
        default,
        rename = "detail-type",
        alias = "detailType",
        skip_serializing_if = "Option::is_none"
    )]
    pub detail_type: Option<Vec<String>>,

    /// Constraints on fields of `detail`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detail: BTreeMap<String, FieldPattern>,
}

/// Constraint on a single detail field
///
/// A JSON array lists the allowed values; a JSON object constrains the
/// fields of a nested detail object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldPattern {
    AnyOf(Vec<Value>),
    Nested(BTreeMap<String, FieldPattern>),
}

impl EventPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `source` to the given values
    pub fn source<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts `detail-type` to the given values
    pub fn detail_type<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.detail_type = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts a top-level detail field to the given string values
    pub fn detail_field<I, S>(mut self, field: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = allowed
            .into_iter()
            .map(|v| Value::String(v.into()))
            .collect();
        self.detail.insert(field.into(), FieldPattern::AnyOf(values));
        self
    }

    /// True when no field is constrained
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.detail_type.is_none() && self.detail.is_empty()
    }
}

/// Evaluates `event` against `pattern`
pub fn matches(event: &Event, pattern: &EventPattern) -> bool {
    if let Some(allowed) = &pattern.source {
        if !allowed.iter().any(|s| *s == event.source) {
            return false;
        }
    }

    if let Some(allowed) = &pattern.detail_type {
        if !allowed.iter().any(|t| *t == event.detail_type) {
            return false;
        }
    }

    fields_match(&event.detail, &pattern.detail)
}

fn fields_match(actual: &Map<String, Value>, constraints: &BTreeMap<String, FieldPattern>) -> bool {
    constraints
        .iter()
        .all(|(key, constraint)| match (actual.get(key), constraint) {
            (None, _) => false,
            (Some(value), FieldPattern::AnyOf(allowed)) => allowed.contains(value),
            (Some(Value::Object(nested)), FieldPattern::Nested(inner)) => {
                fields_match(nested, inner)
            }
            (Some(_), FieldPattern::Nested(_)) => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approved_event() -> Event {
        Event::new(
            "registry",
            "StateChange",
            json!({
                "ModelPackageArn": "arn:1",
                "ModelPackageGroupName": "churn",
                "ModelApprovalStatus": "Approved",
                "Metadata": { "Stage": "prod" }
            }),
        )
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let pattern = EventPattern::new();
        assert!(pattern.is_empty());
        assert!(matches(&approved_event(), &pattern));
        assert!(matches(
            &Event::new("other", "Anything", json!(null)),
            &pattern
        ));
    }

    #[test]
    fn test_source_and_status_match() {
        let pattern = EventPattern::new()
            .source(["registry"])
            .detail_field("ModelApprovalStatus", ["Approved"]);

        assert!(matches(&approved_event(), &pattern));
    }

    #[test]
    fn test_value_outside_allowed_set_drops() {
        let pattern = EventPattern::new().detail_field("ModelApprovalStatus", ["Rejected"]);
        assert!(!matches(&approved_event(), &pattern));

        let pattern = EventPattern::new().source(["aws.sagemaker"]);
        assert!(!matches(&approved_event(), &pattern));

        let pattern = EventPattern::new().detail_type(["Other"]);
        assert!(!matches(&approved_event(), &pattern));
    }

    #[test]
    fn test_absent_field_drops() {
        let pattern = EventPattern::new().detail_field("ModelPackageVersion", ["1"]);
        assert!(!matches(&approved_event(), &pattern));
    }

    #[test]
    fn test_all_fields_must_match() {
        let pattern = EventPattern::new()
            .source(["registry"])
            .detail_field("ModelPackageGroupName", ["churn"])
            .detail_field("ModelApprovalStatus", ["Rejected"]);

        assert!(!matches(&approved_event(), &pattern));
    }

    #[test]
    fn test_group_name_keyed_pattern() {
        let pattern: EventPattern = serde_json::from_value(json!({
            "source": ["registry"],
            "detail-type": ["StateChange"],
            "detail": { "ModelPackageGroupName": ["churn", "fraud"] }
        }))
        .unwrap();

        assert!(matches(&approved_event(), &pattern));
    }

    #[test]
    fn test_nested_detail_pattern() {
        let pattern: EventPattern = serde_json::from_value(json!({
            "detail": { "Metadata": { "Stage": ["prod"] } }
        }))
        .unwrap();
        assert!(matches(&approved_event(), &pattern));

        let pattern: EventPattern = serde_json::from_value(json!({
            "detail": { "Metadata": { "Stage": ["dev"] } }
        }))
        .unwrap();
        assert!(!matches(&approved_event(), &pattern));

        // nested constraint against a scalar value
        let pattern: EventPattern = serde_json::from_value(json!({
            "detail": { "ModelApprovalStatus": { "Stage": ["prod"] } }
        }))
        .unwrap();
        assert!(!matches(&approved_event(), &pattern));
    }

    #[test]
    fn test_non_string_values() {
        let event = Event::new("registry", "StateChange", json!({ "Version": 3 }));
        let pattern: EventPattern =
            serde_json::from_value(json!({ "detail": { "Version": [1, 2, 3] } })).unwrap();

        assert!(matches(&event, &pattern));
    }

    #[test]
    fn test_empty_allowed_set_matches_nothing() {
        let pattern = EventPattern::new().source(Vec::<String>::new());
        assert!(!matches(&approved_event(), &pattern));
    }
}
