//! Roll data built straight from the graph.

use armory_domain::{EntityGraph, RollData};

use super::ports::RollDataProvider;

/// Flattens every actor and item of the graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphRollData;

impl RollDataProvider for GraphRollData {
    fn build(&self, graph: &EntityGraph) -> RollData {
        graph.roll_data()
    }
}
