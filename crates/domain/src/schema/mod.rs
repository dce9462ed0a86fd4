//! Declarative record schemas.
//!
//! A schema is a tree of [`Field`] descriptors interpreted by one generic
//! cleaner: absent values take defaults, raw values are coerced, unknown keys
//! are dropped, and every failing field is reported with its path.

mod catalog;
mod definition;
mod field;

pub use catalog::{
    activity_schema_for, actor_schema, attack_activity_schema, damage_activity_schema,
    damage_part_schema, item_schema, utility_activity_schema, ACTIVITY_TYPES,
    ACTOR_TYPES, ATTACK_CLASSIFICATIONS, ATTACK_TYPES, ITEM_TYPES, WEAPON_TYPES,
};
pub use definition::{Cleaned, SchemaDefinition};
pub use field::{Field, FieldKind};
