//! Data Transfer Objects for the orchestrator API
//!
//! Request and response bodies exchanged between the orchestrator and its
//! clients (CLI, workers, approvers). Full domain types are returned where a
//! caller needs the complete state; summaries are used for listings.

pub mod event;
pub mod execution;
pub mod pipeline;
