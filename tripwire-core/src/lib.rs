//! Tripwire Core
//!
//! Core types and pure logic for the Tripwire model-approval orchestrator.
//!
//! This crate contains:
//! - Domain types: Events, event patterns, pipeline definitions, executions
//! - Pure rules: Event filtering, definition validation, the execution state machine
//! - DTOs: Data transfer objects for the orchestrator HTTP API

pub mod domain;
pub mod dto;
