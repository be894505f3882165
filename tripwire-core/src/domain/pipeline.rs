//! Pipeline domain types
//!
//! A [`PipelineDefinition`] is an ordered list of typed steps linked by
//! `dependsOn`. Both pipeline shapes in use (training followed by a blocking
//! approval, or a single callback approval) are built from the same three
//! step types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;

use super::template::{self, TemplateError};

/// Pipeline definition document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDefinition {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared parameters and their defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDeclaration>,

    /// Steps in declaration order; dependencies must point backwards
    pub steps: Vec<Step>,
}

fn default_version() -> String {
    "1".to_string()
}

/// Named pipeline parameter with an optional default value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDeclaration {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// A single step of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(flatten)]
    pub kind: StepKind,
}

/// Step type with its type-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StepKind {
    /// Runs the (opaque) training job out of band
    Training(TrainingConfig),

    /// Blocks dependents until an explicit approval signal
    Approval,

    /// Like `Approval`, plus a location for the approver's decision payload
    Callback(CallbackConfig),
}

/// Configuration of a training step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    /// Training container image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Input data channels
    #[serde(default)]
    pub inputs: Vec<DataChannel>,

    /// Where model artifacts are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSpec>,

    /// Maximum runtime enforced by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hyperparameters: BTreeMap<String, String>,
}

/// Named training input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChannel {
    pub name: String,
    pub uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Compute requested for a training step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub instance_type: String,

    #[serde(default = "default_instance_count")]
    pub instance_count: u32,

    #[serde(default = "default_volume_size")]
    pub volume_size_gb: u32,
}

fn default_instance_count() -> u32 {
    1
}

fn default_volume_size() -> u32 {
    30
}

/// Configuration of a callback step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackConfig {
    /// Prefix under which callback locations are allocated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_location: Option<String>,
}

/// Step type label without configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    Training,
    Approval,
    Callback,
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepType::Training => write!(f, "Training"),
            StepType::Approval => write!(f, "Approval"),
            StepType::Callback => write!(f, "Callback"),
        }
    }
}

/// A validated definition as held by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPipeline {
    pub definition: PipelineDefinition,
    pub registered_at: DateTime<Utc>,
}

// =============================================================================
// Validation
// =============================================================================

/// Structural problems found in a pipeline definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("pipeline name cannot be empty")]
    EmptyName,

    #[error("pipeline '{0}' has no steps")]
    NoSteps(String),

    #[error("parameter '{0}' is declared more than once")]
    DuplicateParameter(String),

    #[error("step at position {0} has an empty name")]
    EmptyStepName(usize),

    #[error("duplicate step name '{0}'")]
    DuplicateStep(String),

    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("dependency cycle detected involving step '{0}'")]
    Cycle(String),

    #[error("step '{step}' depends on '{dependency}', which is declared after it")]
    ForwardDependency { step: String, dependency: String },

    #[error("step '{step}' is incomplete: {rule}")]
    IncompleteStep { step: String, rule: String },

    #[error("step '{step}' references undeclared parameter '{parameter}'")]
    UndeclaredParameter { step: String, parameter: String },

    #[error("step '{step}' has an invalid placeholder: {source}")]
    InvalidPlaceholder {
        step: String,
        #[source]
        source: TemplateError,
    },
}

impl PipelineDefinition {
    /// Validates the definition
    ///
    /// Checks:
    /// - Non-empty name and at least one step
    /// - Unique parameter and step names
    /// - Every dependency exists, the graph is acyclic and dependencies are declared earlier
    /// - Type-specific configuration is complete
    /// - Placeholders are well formed and name a declared parameter
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }

        if self.steps.is_empty() {
            return Err(DefinitionError::NoSteps(self.name.clone()));
        }

        let mut seen_params = HashSet::new();
        for param in &self.parameters {
            if !seen_params.insert(param.name.as_str()) {
                return Err(DefinitionError::DuplicateParameter(param.name.clone()));
            }
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(DefinitionError::EmptyStepName(idx));
            }
            if positions.insert(step.name.as_str(), idx).is_some() {
                return Err(DefinitionError::DuplicateStep(step.name.clone()));
            }
        }

        for step in &self.steps {
            for dep in &step.depends_on {
                if !positions.contains_key(dep.as_str()) {
                    return Err(DefinitionError::UnknownDependency {
                        step: step.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        self.detect_cycles(&positions)?;

        for (idx, step) in self.steps.iter().enumerate() {
            for dep in &step.depends_on {
                if positions[dep.as_str()] >= idx {
                    return Err(DefinitionError::ForwardDependency {
                        step: step.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        for step in &self.steps {
            step.validate_config()?;

            for field in step.templated_fields() {
                let names = template::placeholders(field).map_err(|source| {
                    DefinitionError::InvalidPlaceholder {
                        step: step.name.clone(),
                        source,
                    }
                })?;

                if let Some(name) = names.into_iter().find(|n| !seen_params.contains(n)) {
                    return Err(DefinitionError::UndeclaredParameter {
                        step: step.name.clone(),
                        parameter: name.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Detects cycles in the dependency graph using Kahn's algorithm
    fn detect_cycles(&self, positions: &HashMap<&str, usize>) -> Result<(), DefinitionError> {
        let n = self.steps.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![vec![]; n];

        for (idx, step) in self.steps.iter().enumerate() {
            for dep in &step.depends_on {
                let dep_idx = positions[dep.as_str()];
                dependents[dep_idx].push(idx);
                in_degree[idx] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;

        while let Some(node) = queue.pop() {
            visited += 1;
            for &next in &dependents[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        if visited != n {
            let culprit = (0..n)
                .find(|&i| in_degree[i] > 0)
                .map(|i| self.steps[i].name.clone())
                .unwrap_or_default();
            return Err(DefinitionError::Cycle(culprit));
        }

        Ok(())
    }

    /// Looks up a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Declared parameter defaults
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.parameters
            .iter()
            .filter_map(|p| p.default_value.clone().map(|v| (p.name.clone(), v)))
            .collect()
    }

    /// Every parameter name referenced by a placeholder in any step
    pub fn referenced_parameters(&self) -> BTreeSet<String> {
        self.steps
            .iter()
            .flat_map(|s| s.templated_fields())
            .filter_map(|field| template::placeholders(field).ok())
            .flatten()
            .map(str::to_string)
            .collect()
    }
}

impl Step {
    pub fn step_type(&self) -> StepType {
        match self.kind {
            StepKind::Training(_) => StepType::Training,
            StepKind::Approval => StepType::Approval,
            StepKind::Callback(_) => StepType::Callback,
        }
    }

    /// Returns a copy with every placeholder replaced from `parameters`
    pub fn render(&self, parameters: &BTreeMap<String, String>) -> Result<Step, TemplateError> {
        let mut rendered = self.clone();
        for field in rendered.templated_fields_mut() {
            *field = template::render(field, parameters)?;
        }
        Ok(rendered)
    }

    fn validate_config(&self) -> Result<(), DefinitionError> {
        let incomplete = |rule: &str| DefinitionError::IncompleteStep {
            step: self.name.clone(),
            rule: rule.to_string(),
        };

        match &self.kind {
            StepKind::Training(cfg) => {
                if cfg.inputs.is_empty() {
                    return Err(incomplete("training requires at least one input channel"));
                }
                if cfg
                    .inputs
                    .iter()
                    .any(|c| c.name.trim().is_empty() || c.uri.trim().is_empty())
                {
                    return Err(incomplete("input channels need a name and a uri"));
                }
                if is_blank(cfg.output_location.as_deref()) {
                    return Err(incomplete("training requires an output location"));
                }
                match &cfg.resources {
                    None => return Err(incomplete("training requires a resource spec")),
                    Some(res) if res.instance_type.trim().is_empty() => {
                        return Err(incomplete("resource spec needs an instance type"));
                    }
                    Some(res) if res.instance_count == 0 => {
                        return Err(incomplete("resource spec needs at least one instance"));
                    }
                    Some(_) => {}
                }
                if cfg.timeout_seconds.unwrap_or(0) == 0 {
                    return Err(incomplete("training requires a non-zero timeout"));
                }
            }
            StepKind::Approval => {}
            StepKind::Callback(cfg) => {
                if is_blank(cfg.output_location.as_deref()) {
                    return Err(incomplete("callback requires an output location"));
                }
            }
        }

        Ok(())
    }

    fn templated_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        match &self.kind {
            StepKind::Training(cfg) => {
                fields.extend(cfg.image.as_deref());
                fields.extend(cfg.inputs.iter().map(|c| c.uri.as_str()));
                fields.extend(cfg.output_location.as_deref());
                fields.extend(cfg.resources.as_ref().map(|r| r.instance_type.as_str()));
                fields.extend(cfg.hyperparameters.values().map(String::as_str));
            }
            StepKind::Approval => {}
            StepKind::Callback(cfg) => fields.extend(cfg.output_location.as_deref()),
        }
        fields
    }

    fn templated_fields_mut(&mut self) -> Vec<&mut String> {
        let mut fields = Vec::new();
        match &mut self.kind {
            StepKind::Training(cfg) => {
                fields.extend(cfg.image.as_mut());
                fields.extend(cfg.inputs.iter_mut().map(|c| &mut c.uri));
                fields.extend(cfg.output_location.as_mut());
                fields.extend(cfg.resources.as_mut().map(|r| &mut r.instance_type));
                fields.extend(cfg.hyperparameters.values_mut());
            }
            StepKind::Approval => {}
            StepKind::Callback(cfg) => fields.extend(cfg.output_location.as_mut()),
        }
        fields
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
