//! Port traits for the pipeline's collaborators.
//!
//! Ports exist for:
//! - Building the roll data snapshot (hosts may add their own values)
//! - Reporting preparation failures (logs, UI notifications, test capture)

use armory_domain::{EntityGraph, RollData};

use crate::use_cases::preparation::PreparationFailure;

/// Builds the read-only snapshot the final phase reads. Called once per
/// pass, after the derived phase.
#[cfg_attr(test, mockall::automock)]
pub trait RollDataProvider: Send + Sync {
    fn build(&self, graph: &EntityGraph) -> RollData;
}

/// Receives every per-entity failure as it happens.
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, failure: &PreparationFailure);
}
