//! The daily run.
//!
//! This module provides:
//! - Stage names and the run context shared between stages
//! - The injected collaborators
//! - The orchestrator and its terminal reports

mod context;
mod orchestrator;
mod ports;
mod report;

#[cfg(test)]
mod integration_tests;

pub use context::{RunContext, StageName};
pub use orchestrator::{Orchestrator, RunSettings};
pub use ports::{Collaborators, Unavailable};
pub use report::{FailureReport, RunOutcome, SuccessReport, TRACE_LIMIT};
