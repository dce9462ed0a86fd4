//! Use cases orchestrating the domain over an entity graph.

pub mod preparation;
