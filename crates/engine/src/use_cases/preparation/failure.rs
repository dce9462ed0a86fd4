//! Per-entity preparation failures.

use std::fmt;

use armory_domain::{ActivityId, ActorId, DomainError, ItemId, SchemaError};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Actor,
    Item,
    Activity,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Item => "item",
            Self::Activity => "activity",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one entity in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Actor(ActorId),
    Item(ItemId),
    Activity(ActivityId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Actor(_) => EntityKind::Actor,
            Self::Item(_) => EntityKind::Item,
            Self::Activity(_) => EntityKind::Activity,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Actor(id) => id.to_uuid(),
            Self::Item(id) => id.to_uuid(),
            Self::Activity(id) => id.to_uuid(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Pipeline phases, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Base,
    Derived,
    Final,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Base, Phase::Derived, Phase::Final];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Derived => "derived",
            Self::Final => "final",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreparationError {
    /// The stored record failed validation; defaults were used for the
    /// failing fields.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Parent {0} is missing")]
    MissingParent(EntityRef),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PreparationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema",
            Self::MissingParent(_) => "missing_parent",
            Self::Domain(err) => err.kind(),
        }
    }
}

/// One entity that could not be fully prepared in one phase.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{phase} phase failed for {entity}: {error}")]
pub struct PreparationFailure {
    pub entity: EntityRef,
    pub phase: Phase,
    pub error: PreparationError,
}

impl PreparationFailure {
    pub fn new(entity: EntityRef, phase: Phase, error: impl Into<PreparationError>) -> Self {
        Self {
            entity,
            phase,
            error: error.into(),
        }
    }
}

/// Flat, serializable view of a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSummary {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub phase: Phase,
    pub error_kind: &'static str,
    pub message: String,
}

impl From<&PreparationFailure> for FailureSummary {
    fn from(failure: &PreparationFailure) -> Self {
        Self {
            entity_kind: failure.entity.kind(),
            entity_id: failure.entity.id(),
            phase: failure.phase,
            error_kind: failure.error.kind(),
            message: failure.error.to_string(),
        }
    }
}
