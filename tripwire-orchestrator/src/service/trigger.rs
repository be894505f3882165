//! Trigger handler
//!
//! Turns a matched model package state change into a start request. Each
//! delivery carries an idempotency key of (pipeline, model package, status),
//! so a redelivered event lands on the execution the first delivery created.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use tripwire_core::domain::event::{DetailError, Event};
use tripwire_core::domain::execution::{ExecutionHandle, IdempotencyKey, Parameter};
use tripwire_core::domain::pattern::EventPattern;

use crate::service::engine::{Engine, StartError, StartRequest};

pub const MODEL_PACKAGE_ARN: &str = "ModelPackageArn";
pub const MODEL_APPROVAL_STATUS: &str = "ModelApprovalStatus";
pub const MODEL_PACKAGE_GROUP_NAME: &str = "ModelPackageGroupName";

/// Parameters taken from the event; static parameters never replace them
pub const EVENT_PARAMETERS: [&str; 3] = [
    MODEL_PACKAGE_ARN,
    MODEL_APPROVAL_STATUS,
    MODEL_PACKAGE_GROUP_NAME,
];

/// Binds an event pattern to the pipeline it starts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRule {
    pub name: String,

    /// An empty pattern matches every event
    #[serde(default)]
    pub pattern: EventPattern,

    pub pipeline_name: String,

    /// Also pass the model package group name as a parameter
    #[serde(default)]
    pub require_group_name: bool,

    /// Extra parameters added to every start, after the event-derived ones
    #[serde(default)]
    pub static_parameters: Vec<Parameter>,
}

impl TriggerRule {
    /// Static parameters whose names belong to the event
    pub fn shadowing_parameters(&self) -> impl Iterator<Item = &str> {
        self.static_parameters
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| EVENT_PARAMETERS.contains(name))
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] DetailError),

    #[error(transparent)]
    Start(#[from] StartError),
}

pub struct TriggerHandler {
    engine: Engine,
    rule: TriggerRule,
}

impl TriggerHandler {
    pub fn new(engine: Engine, rule: TriggerRule) -> Self {
        Self { engine, rule }
    }

    pub fn rule(&self) -> &TriggerRule {
        &self.rule
    }

    /// Build the start request for an event without starting anything
    pub fn build_request(&self, event: &Event) -> Result<StartRequest, DetailError> {
        let change = event.model_package_change()?;
        let arn = change.require_arn()?;
        let status = change.require_status()?;

        let mut parameters = vec![
            Parameter::new(MODEL_PACKAGE_ARN, arn),
            Parameter::new(MODEL_APPROVAL_STATUS, status.as_str()),
        ];
        if self.rule.require_group_name {
            parameters.push(Parameter::new(
                MODEL_PACKAGE_GROUP_NAME,
                change.require_group_name()?,
            ));
        }
        for param in &self.rule.static_parameters {
            if EVENT_PARAMETERS.contains(&param.name.as_str()) {
                warn!(
                    rule = %self.rule.name,
                    parameter = %param.name,
                    "Ignoring static parameter that shadows the event"
                );
                continue;
            }
            parameters.push(param.clone());
        }

        let key = IdempotencyKey {
            pipeline_name: self.rule.pipeline_name.clone(),
            model_identifier: arn.to_string(),
            approval_status: status,
        };

        Ok(StartRequest::new(self.rule.pipeline_name.clone(), parameters).with_idempotency_key(key))
    }

    /// Start (or find) the execution for an event
    pub async fn on_event(&self, event: &Event) -> Result<ExecutionHandle, HandlerError> {
        let request = match self.build_request(event) {
            Ok(request) => request,
            Err(e) => {
                warn!(rule = %self.rule.name, error = %e, "Dropping malformed event");
                return Err(e.into());
            }
        };

        match self.engine.start(request).await {
            Ok(handle) => {
                info!(
                    rule = %self.rule.name,
                    pipeline = %self.rule.pipeline_name,
                    execution = %handle,
                    "Pipeline triggered"
                );
                Ok(handle)
            }
            Err(e) => {
                warn!(rule = %self.rule.name, pipeline = %self.rule.pipeline_name, error = %e, "Trigger failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{
        RecordingLauncher, approved_event, storage_defaults, training_pipeline,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tripwire_core::domain::execution::ExecutionStatus;

    fn handler(require_group_name: bool) -> (TriggerHandler, Engine) {
        let engine = Engine::new(Arc::new(RecordingLauncher::default()), storage_defaults());
        engine.register(training_pipeline()).unwrap();

        let rule = TriggerRule {
            name: "retrain-on-approval".to_string(),
            pattern: EventPattern::default(),
            pipeline_name: "pipeline-x".to_string(),
            require_group_name,
            static_parameters: vec![Parameter::new("Stage", "prod")],
        };
        (TriggerHandler::new(engine.clone(), rule), engine)
    }

    #[test]
    fn test_rule_from_json() {
        let rule: TriggerRule = serde_json::from_value(json!({
            "name": "group-approvals",
            "pipelineName": "pipeline-x",
            "pattern": {
                "source": ["aws.sagemaker"],
                "detail": {"ModelPackageGroupName": ["fraud-models"]}
            },
            "requireGroupName": true
        }))
        .unwrap();

        assert!(rule.require_group_name);
        assert!(rule.static_parameters.is_empty());
        assert!(!rule.pattern.is_empty());
    }

    #[tokio::test]
    async fn test_build_request_parameters() {
        let (handler, _) = handler(true);

        let request = handler.build_request(&approved_event("arn:aws:mp/1")).unwrap();

        assert_eq!(request.pipeline_name, "pipeline-x");
        let names: Vec<&str> = request.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["ModelPackageArn", "ModelApprovalStatus", "ModelPackageGroupName", "Stage"]
        );
        assert_eq!(request.parameters[1].value, "Approved");

        let key = request.idempotency_key.unwrap();
        assert_eq!(key.model_identifier, "arn:aws:mp/1");
    }

    #[tokio::test]
    async fn test_static_parameters_cannot_replace_event_values() {
        let engine = Engine::new(Arc::new(RecordingLauncher::default()), storage_defaults());
        engine.register(training_pipeline()).unwrap();
        let rule = TriggerRule {
            name: "pinned".to_string(),
            pattern: EventPattern::default(),
            pipeline_name: "pipeline-x".to_string(),
            require_group_name: false,
            static_parameters: vec![
                Parameter::new("ModelPackageArn", "arn:aws:mp/pinned"),
                Parameter::new("ModelApprovalStatus", "Rejected"),
                Parameter::new("Stage", "prod"),
            ],
        };
        assert_eq!(
            rule.shadowing_parameters().collect::<Vec<_>>(),
            vec!["ModelPackageArn", "ModelApprovalStatus"]
        );
        let handler = TriggerHandler::new(engine.clone(), rule);

        let handle = handler.on_event(&approved_event("arn:aws:mp/1")).await.unwrap();

        let execution = engine.describe(handle).unwrap();
        assert_eq!(
            execution.parameters.get("ModelPackageArn").map(String::as_str),
            Some("arn:aws:mp/1")
        );
        assert_eq!(
            execution.parameters.get("ModelApprovalStatus").map(String::as_str),
            Some("Approved")
        );
        assert_eq!(execution.parameters.get("Stage").map(String::as_str), Some("prod"));
    }

    #[tokio::test]
    async fn test_on_event_starts_execution() {
        let (handler, engine) = handler(false);

        let handle = handler.on_event(&approved_event("arn:aws:mp/1")).await.unwrap();

        let execution = engine.describe(handle).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Executing);
        assert_eq!(
            execution.parameters.get("ModelPackageArn").map(String::as_str),
            Some("arn:aws:mp/1")
        );
        assert_eq!(
            execution.parameters.get("Stage").map(String::as_str),
            Some("prod")
        );
    }

    #[tokio::test]
    async fn test_duplicate_delivery_returns_same_execution() {
        let (handler, engine) = handler(false);
        let event = approved_event("arn:aws:mp/1");

        let first = handler.on_event(&event).await.unwrap();
        let second = handler.on_event(&event).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.list(None).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_arn_is_malformed() {
        let (handler, engine) = handler(false);
        let event = Event::new(
            "aws.sagemaker",
            "SageMaker Model Package State Change",
            json!({"ModelApprovalStatus": "Approved"}),
        );

        let err = handler.on_event(&event).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::MalformedEvent(DetailError::Missing("ModelPackageArn"))
        ));
        assert_eq!(engine.list(None).len(), 0);
    }

    #[tokio::test]
    async fn test_missing_group_name_when_required() {
        let (handler, _) = handler(true);
        let event = Event::new(
            "aws.sagemaker",
            "SageMaker Model Package State Change",
            json!({"ModelPackageArn": "arn:aws:mp/1", "ModelApprovalStatus": "Approved"}),
        );

        assert!(matches!(
            handler.on_event(&event).await,
            Err(HandlerError::MalformedEvent(DetailError::Missing("ModelPackageGroupName")))
        ));
    }

    #[tokio::test]
    async fn test_unregistered_pipeline() {
        let engine = Engine::new(Arc::new(RecordingLauncher::default()), storage_defaults());
        let rule = TriggerRule {
            name: "orphan".to_string(),
            pattern: EventPattern::default(),
            pipeline_name: "missing".to_string(),
            require_group_name: false,
            static_parameters: vec![],
        };
        let handler = TriggerHandler::new(engine, rule);

        assert!(matches!(
            handler.on_event(&approved_event("arn:aws:mp/1")).await,
            Err(HandlerError::Start(StartError::UnknownDefinition(_)))
        ));
    }
}
