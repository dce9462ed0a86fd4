//! Common helpers shared by the schema layer, entity records and migration.
//!
//! # Design Principles
//!
//! - **Pure functions only** - no side effects, no I/O
//! - **Explicit presence** - "unset" is modelled as `None`/empty, never as a falsy value

pub mod fill;
pub mod string;

pub use fill::{set_if_absent, Absent};
pub use string::{none_if_blank, StringExt};
