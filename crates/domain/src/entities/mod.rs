//! Entities of the preparation graph: actor → items → activities, with
//! damage parts owned by activities.

pub mod activity;
mod actor;
mod damage_part;
mod item;

pub use activity::{
    AbilitySelection, Activity, ActivityContext, ActivityKind, ActivityLabels, ActivityOutput,
    AttackActivity, AttackRollConfig, DamageActivity, DamageLabel, DamageRollConfig,
    UtilityActivity,
};
pub use actor::{AbilityScore, ActionBonuses, Actor, ActorDerived, ActorFlags, ActorKind, ClassEntry};
pub use damage_part::{CustomDamage, DamagePart};
pub use item::{
    Item, ItemCritical, ItemDamage, ItemDerived, ItemKind, ItemLabels, WeaponType,
    PROPERTY_FINESSE, PROPERTY_MAGICAL, PROPERTY_VERSATILE,
};
