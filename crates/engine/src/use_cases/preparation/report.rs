//! Summary of one preparation pass.

use serde::Serialize;

use super::failure::{EntityKind, FailureSummary, Phase, PreparationFailure};

/// Entities that completed one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTally {
    pub actors: usize,
    pub items: usize,
    pub activities: usize,
}

impl PhaseTally {
    pub fn total(&self) -> usize {
        self.actors + self.items + self.activities
    }

    fn count(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Actor => self.actors += 1,
            EntityKind::Item => self.items += 1,
            EntityKind::Activity => self.activities += 1,
        }
    }
}

/// Serializable form of a [`PassReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub base: PhaseTally,
    pub derived: PhaseTally,
    #[serde(rename = "final")]
    pub final_phase: PhaseTally,
    pub failures: Vec<FailureSummary>,
    pub halted: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    tallies: [PhaseTally; 3],
    failures: Vec<PreparationFailure>,
    halted: bool,
}

impl PassReport {
    pub fn tally(&self, phase: Phase) -> PhaseTally {
        self.tallies[phase.index()]
    }

    pub fn failures(&self) -> &[PreparationFailure] {
        &self.failures
    }

    /// Failures recorded in one phase.
    pub fn failures_in(&self, phase: Phase) -> impl Iterator<Item = &PreparationFailure> {
        self.failures.iter().filter(move |f| f.phase == phase)
    }

    /// Whether a strict pass stopped at its first failure.
    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> PassSummary {
        PassSummary {
            base: self.tally(Phase::Base),
            derived: self.tally(Phase::Derived),
            final_phase: self.tally(Phase::Final),
            failures: self.failures.iter().map(FailureSummary::from).collect(),
            halted: self.halted,
        }
    }

    pub(crate) fn prepared(&mut self, phase: Phase, kind: EntityKind) {
        self.tallies[phase.index()].count(kind);
    }

    pub(crate) fn failed(&mut self, failure: PreparationFailure) {
        self.failures.push(failure);
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }
}
