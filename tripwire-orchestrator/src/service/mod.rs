//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod engine;
pub mod launcher;
pub mod notification;
pub mod orchestrator;
pub mod trigger;

#[cfg(test)]
pub mod testing;

// Re-export for convenience
pub use engine::Engine;
pub use orchestrator::Orchestrator;
