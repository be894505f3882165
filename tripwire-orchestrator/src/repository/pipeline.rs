//! Pipeline Repository
//!
//! Holds registered pipeline definitions, keyed by name. Definitions are
//! validated by the engine before they get here.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tripwire_core::domain::pipeline::{PipelineDefinition, RegisteredPipeline};

#[derive(Default)]
pub struct PipelineRepository {
    pipelines: RwLock<HashMap<String, Arc<RegisteredPipeline>>>,
}

impl PipelineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition, replacing any previous one with the same name
    ///
    /// Returns the stored record and whether an older version was replaced.
    pub fn upsert(&self, definition: PipelineDefinition) -> (Arc<RegisteredPipeline>, bool) {
        let record = Arc::new(RegisteredPipeline {
            definition,
            registered_at: Utc::now(),
        });

        let mut pipelines = self.pipelines.write().unwrap_or_else(|e| e.into_inner());
        let replaced = pipelines
            .insert(record.definition.name.clone(), Arc::clone(&record))
            .is_some();

        (record, replaced)
    }

    /// Find a definition by name
    pub fn find_by_name(&self, name: &str) -> Option<Arc<RegisteredPipeline>> {
        let pipelines = self.pipelines.read().unwrap_or_else(|e| e.into_inner());
        pipelines.get(name).cloned()
    }

    /// List all definitions, sorted by name
    pub fn list_all(&self) -> Vec<Arc<RegisteredPipeline>> {
        let pipelines = self.pipelines.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = pipelines.values().cloned().collect();
        all.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));
        all
    }
}
