//! Test doubles and fixtures shared by the service and api tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tripwire_core::domain::event::Event;
use tripwire_core::domain::notification::Notification;
use tripwire_core::domain::pipeline::PipelineDefinition;

use crate::service::launcher::{TrainingJob, TrainingLauncher};
use crate::service::notification::{NotifyError, Publisher};

#[derive(Default)]
pub struct RecordingLauncher {
    jobs: Mutex<Vec<TrainingJob>>,
}

impl RecordingLauncher {
    pub fn jobs(&self) -> Vec<TrainingJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrainingLauncher for RecordingLauncher {
    async fn launch(&self, job: TrainingJob) -> anyhow::Result<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

pub struct FailingLauncher;

#[async_trait]
impl TrainingLauncher for FailingLauncher {
    async fn launch(&self, _job: TrainingJob) -> anyhow::Result<()> {
        anyhow::bail!("worker unreachable")
    }
}

/// Never finishes a submission, like a worker that accepts the connection and stalls
pub struct HangingLauncher;

#[async_trait]
impl TrainingLauncher for HangingLauncher {
    async fn launch(&self, _job: TrainingJob) -> anyhow::Result<()> {
        std::future::pending().await
    }
}

/// Lets spawned launch tasks run before the test inspects the launcher
pub async fn run_pending_tasks() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<(String, Notification)>>,
}

impl RecordingPublisher {
    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), notification.clone()));
        Ok(())
    }
}

pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, topic: &str, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Publish {
            topic: topic.to_string(),
            message: "topic unavailable".to_string(),
        })
    }
}

pub fn storage_defaults() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("TrainingDataUri".to_string(), "s3://data".to_string()),
        ("ArtifactUri".to_string(), "s3://artifacts".to_string()),
    ])
}

/// Training, then an approval gate, then a callback
pub fn training_pipeline() -> PipelineDefinition {
    serde_json::from_value(json!({
        "name": "pipeline-x",
        "parameters": [
            {"name": "ModelPackageArn"},
            {"name": "ModelApprovalStatus", "defaultValue": "PendingManualApproval"},
            {"name": "TrainingDataUri"},
            {"name": "ArtifactUri"}
        ],
        "steps": [
            {
                "name": "Training",
                "type": "Training",
                "inputs": [{"name": "train", "uri": "{{TrainingDataUri}}/train"}],
                "outputLocation": "{{ArtifactUri}}/{{ModelPackageArn}}",
                "resources": {"instanceType": "ml.m5.xlarge"},
                "timeoutSeconds": 60
            },
            {"name": "Gate", "type": "Approval", "dependsOn": ["Training"]},
            {
                "name": "Register",
                "type": "Callback",
                "dependsOn": ["Gate"],
                "outputLocation": "s3://callbacks/"
            }
        ]
    }))
    .unwrap()
}

/// A single callback step waiting on an external approver
pub fn callback_pipeline() -> PipelineDefinition {
    serde_json::from_value(json!({
        "name": "callback-approval",
        "parameters": [{"name": "ArtifactUri"}],
        "steps": [
            {
                "name": "ApprovalCallback",
                "type": "Callback",
                "outputLocation": "{{ArtifactUri}}/callbacks"
            }
        ]
    }))
    .unwrap()
}

pub fn approved_event(arn: &str) -> Event {
    Event::new(
        "aws.sagemaker",
        "SageMaker Model Package State Change",
        json!({
            "ModelPackageArn": arn,
            "ModelPackageGroupName": "fraud-models",
            "ModelApprovalStatus": "Approved"
        }),
    )
    .with_id("evt-1")
}
