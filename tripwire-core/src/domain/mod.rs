//! Core domain types
//!
//! This module contains the domain structures used across Tripwire services.
//! They are shared between the orchestrator (which owns and mutates them) and
//! the client/CLI (which reads them over HTTP).

pub mod event;
pub mod execution;
pub mod notification;
pub mod pattern;
pub mod pipeline;
pub mod template;
