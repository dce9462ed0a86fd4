//! Armory engine library.
//!
//! Runs the preparation pipeline over an `armory-domain` entity graph.
//!
//! ## Structure
//!
//! - `use_cases/` - The preparation pass
//! - `infrastructure/` - Ports and adapters, settings, telemetry, bundles

pub mod infrastructure;
pub mod use_cases;

pub use infrastructure::diagnostics::{CollectingSink, TracingDiagnostics};
pub use infrastructure::ports::{DiagnosticSink, RollDataProvider};
pub use infrastructure::roll_data::GraphRollData;
pub use infrastructure::settings::PipelineSettings;
pub use use_cases::preparation::{
    EntityKind, EntityRef, FailureSummary, PassReport, PassSummary, Phase, PhaseTally,
    PrepareGraph, PreparationError, PreparationFailure,
};
