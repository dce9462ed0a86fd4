//! Diagnostic sinks.

use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::ports::DiagnosticSink;
use crate::use_cases::preparation::PreparationFailure;

/// Logs each failure as a structured warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, failure: &PreparationFailure) {
        warn!(
            entity_kind = %failure.entity.kind(),
            entity_id = %failure.entity.id(),
            phase = %failure.phase,
            error_kind = failure.error.kind(),
            error = %failure.error,
            "Entity preparation failed"
        );
    }
}

/// Keeps every reported failure for later inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    failures: Mutex<Vec<PreparationFailure>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<PreparationFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return and forget everything collected so far.
    pub fn drain(&self) -> Vec<PreparationFailure> {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, failure: &PreparationFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure.clone());
    }
}
