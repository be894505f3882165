//! Repository Module
//!
//! In-process storage for the orchestrator.
//! Each repository owns the state for one domain entity.

pub mod execution;
pub mod pipeline;

// Re-export for convenience
pub use execution::{ExecutionRecord, ExecutionRepository, SharedRecord};
pub use pipeline::PipelineRepository;
