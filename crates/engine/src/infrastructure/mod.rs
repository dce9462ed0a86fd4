//! Infrastructure: port traits and their standard adapters, configuration,
//! telemetry and JSON bundles.

pub mod bundle;
pub mod diagnostics;
pub mod ports;
pub mod roll_data;
pub mod settings;
pub mod telemetry;
