//! Orchestration layer for provider publishing
//!
//! This module sequences scanning, registration and uploads into the
//! publish workflow.

pub mod publish_orchestrator;

pub use publish_orchestrator::{
    PlatformOutcome, PlatformStatus, PublishFailure, PublishOrchestrator, PublishReport, exit_code,
    publish,
};
