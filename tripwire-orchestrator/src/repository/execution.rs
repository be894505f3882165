//! Execution Repository
//!
//! The registry of executions is the only state shared between concurrent
//! event deliveries. Two levels of locking keep it consistent:
//!
//! - the registry lock covers insertion and the idempotency index, so a
//!   duplicate start can never slip in between lookup and insert
//! - each execution sits behind its own mutex, serialising transitions for
//!   one handle without blocking the others

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tripwire_core::domain::execution::{ExecutionHandle, IdempotencyKey, PipelineExecution};
use tripwire_core::domain::pipeline::Step;

/// An execution together with the rendered steps it runs
#[derive(Debug)]
pub struct ExecutionRecord {
    pub execution: PipelineExecution,

    /// Step configuration with parameters substituted, in declaration order
    pub steps: Vec<Step>,
}

impl ExecutionRecord {
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Handle on one record; lock it to read or transition
#[derive(Debug, Clone)]
pub struct SharedRecord(Arc<Mutex<ExecutionRecord>>);

impl SharedRecord {
    pub fn lock(&self) -> MutexGuard<'_, ExecutionRecord> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Default)]
struct Registry {
    executions: HashMap<ExecutionHandle, SharedRecord>,
    by_key: HashMap<IdempotencyKey, ExecutionHandle>,
}

#[derive(Default)]
pub struct ExecutionRepository {
    registry: RwLock<Registry>,
}

impl ExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record unless its idempotency key is already taken
    ///
    /// Returns the handle that owns the key and whether a new record was
    /// inserted.
    pub fn insert(&self, record: ExecutionRecord) -> (ExecutionHandle, bool) {
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());

        if let Some(key) = &record.execution.idempotency_key {
            if let Some(existing) = registry.by_key.get(key) {
                return (*existing, false);
            }
        }

        let handle = record.execution.id;
        if let Some(key) = record.execution.idempotency_key.clone() {
            registry.by_key.insert(key, handle);
        }
        registry
            .executions
            .insert(handle, SharedRecord(Arc::new(Mutex::new(record))));

        (handle, true)
    }

    /// Find the execution that owns an idempotency key
    pub fn find_by_key(&self, key: &IdempotencyKey) -> Option<ExecutionHandle> {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        registry.by_key.get(key).copied()
    }

    /// Find a record by handle
    pub fn find(&self, handle: ExecutionHandle) -> Option<SharedRecord> {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        registry.executions.get(&handle).cloned()
    }

    /// Snapshot executions, optionally restricted to one pipeline, newest first
    pub fn list(&self, pipeline_name: Option<&str>) -> Vec<PipelineExecution> {
        let records: Vec<SharedRecord> = {
            let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
            registry.executions.values().cloned().collect()
        };

        let mut executions: Vec<PipelineExecution> = records
            .iter()
            .map(|r| r.lock().execution.clone())
            .filter(|e| pipeline_name.is_none_or(|name| e.pipeline_name == name))
            .collect();
        executions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        executions
    }

    pub fn len(&self) -> usize {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        registry.executions.len()
    }
}
