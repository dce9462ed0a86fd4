//! Armory domain: record schemas, roll formulas, the actor/item/activity
//! entity graph, attack and damage rules, and legacy migration.
//!
//! Everything here is pure. Logging, configuration and the preparation
//! pipeline live in `armory-engine`.

pub mod common;
pub mod entities;
pub mod error;
pub mod formula;
pub mod graph;
pub mod ids;
pub mod migration;
pub mod roll_data;
pub mod rules;
pub mod schema;

pub use entities::{
    AbilitySelection, Activity, ActivityContext, ActivityKind, ActivityLabels, ActivityOutput,
    Actor, ActorKind, AttackActivity, AttackRollConfig, DamageActivity, DamageLabel, DamagePart,
    DamageRollConfig, Item, ItemKind, UtilityActivity, WeaponType,
};
pub use error::{DomainError, FieldFailure, MigrationError, SchemaError};
pub use formula::{Formula, FormulaError, FormulaSimplifier, SimplifyOptions, StandardSimplifier};
pub use graph::{EntityGraph, Record};
pub use ids::{ActivityId, ActorId, ItemId};
pub use migration::{transform_legacy, LegacyItemRecord, MigratedRecord};
pub use roll_data::{RollContext, RollData, RollLookup, RollScope, RollValues};
pub use rules::{
    ActionTypeCode, AttackClassification, AttackMode, AttackType, RulesTables,
    DEFAULT_CRITICAL_THRESHOLD,
};
pub use schema::{Cleaned, Field, FieldKind, SchemaDefinition};
