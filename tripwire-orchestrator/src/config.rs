//! Orchestrator configuration
//!
//! Loaded from the JSON file named by `TRIPWIRE_CONFIG` (all sections
//! optional), then overridden from the environment:
//! - TRIPWIRE_BIND_ADDR (default: 0.0.0.0:8080)
//! - TRIPWIRE_TOPIC (default: model-approvals)
//! - TRIPWIRE_SUBSCRIBERS (comma separated webhook URLs)
//! - TRIPWIRE_WORKER_URL (training worker endpoint)

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tripwire_core::domain::pipeline::PipelineDefinition;

use crate::service::trigger::TriggerRule;

pub const TRAINING_DATA_URI: &str = "TrainingDataUri";
pub const ARTIFACT_URI: &str = "ArtifactUri";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub bind_addr: String,
    pub notification: NotificationConfig,
    pub storage: StorageConfig,
    pub launcher: LauncherConfig,

    /// Trigger rules evaluated against every delivered event
    pub rules: Vec<TriggerRule>,

    /// Pipeline definitions registered at startup
    pub pipelines: Vec<PipelineDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationConfig {
    pub topic: String,

    /// Webhook URLs; when empty notifications only go to the log
    pub subscribers: Vec<String>,
}

/// Storage locations, handed to definitions as default parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub training_data_uri: Option<String>,
    pub artifact_uri: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LauncherConfig {
    /// Training worker endpoint; when unset jobs only go to the log
    pub worker_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            notification: NotificationConfig::default(),
            storage: StorageConfig::default(),
            launcher: LauncherConfig::default(),
            rules: Vec::new(),
            pipelines: Vec::new(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            topic: "model-approvals".to_string(),
            subscribers: Vec::new(),
        }
    }
}

impl Config {
    /// Load the configuration file (if any) and apply environment overrides
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("TRIPWIRE_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply overrides looked up by variable name
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("TRIPWIRE_BIND_ADDR") {
            self.bind_addr = addr;
        }

        if let Some(topic) = lookup("TRIPWIRE_TOPIC") {
            self.notification.topic = topic;
        }

        if let Some(subscribers) = lookup("TRIPWIRE_SUBSCRIBERS") {
            self.notification.subscribers = subscribers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(url) = lookup("TRIPWIRE_WORKER_URL") {
            self.launcher.worker_url = Some(url).filter(|u| !u.trim().is_empty());
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.notification.topic.trim().is_empty() {
            anyhow::bail!("notification topic cannot be empty");
        }

        for url in self
            .notification
            .subscribers
            .iter()
            .chain(self.launcher.worker_url.iter())
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("'{}' must start with http:// or https://", url);
            }
        }

        let mut names = std::collections::HashSet::new();
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                anyhow::bail!("trigger rule names cannot be empty");
            }
            if !names.insert(rule.name.as_str()) {
                anyhow::bail!("duplicate trigger rule '{}'", rule.name);
            }
            if rule.pipeline_name.trim().is_empty() {
                anyhow::bail!("trigger rule '{}' names no pipeline", rule.name);
            }
            if let Some(name) = rule.shadowing_parameters().next() {
                anyhow::bail!(
                    "trigger rule '{}' sets static parameter '{}', which comes from the event",
                    rule.name,
                    name
                );
            }
        }

        Ok(())
    }

    /// Parameters every execution starts with
    pub fn default_parameters(&self) -> BTreeMap<String, String> {
        let mut defaults = BTreeMap::new();
        if let Some(uri) = &self.storage.training_data_uri {
            defaults.insert(TRAINING_DATA_URI.to_string(), uri.clone());
        }
        if let Some(uri) = &self.storage.artifact_uri {
            defaults.insert(ARTIFACT_URI.to_string(), uri.clone());
        }
        defaults
    }
}
