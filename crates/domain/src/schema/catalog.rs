//! The record schemas of the entity graph.
//!
//! Built once and shared; every record of a kind is validated by the same
//! descriptor tree.

use once_cell::sync::Lazy;

use super::{Field, SchemaDefinition};

pub const ACTIVITY_TYPES: &[&str] = &["attack", "damage", "utility"];
pub const ATTACK_TYPES: &[&str] = &["melee", "ranged"];
pub const ATTACK_CLASSIFICATIONS: &[&str] = &["weapon", "spell", "unarmed"];
pub const ITEM_TYPES: &[&str] = &["equipment", "weapon", "spell", "consumable", "feat", "tool"];
pub const WEAPON_TYPES: &[&str] = &[
    "simpleM", "martialM", "simpleR", "martialR", "natural", "improv",
];
pub const ACTOR_TYPES: &[&str] = &["character", "npc"];

static DAMAGE_PART: Lazy<SchemaDefinition> = Lazy::new(|| {
    SchemaDefinition::new("damagePart")
        .with("number", Field::integer().min(0.0).nullable())
        .with("denomination", Field::integer().min(0.0).nullable())
        .with("bonus", Field::formula())
        .with("types", Field::set(Field::string().not_blank()))
        .with(
            "custom",
            Field::object(
                SchemaDefinition::new("customDamage")
                    .with("enabled", Field::boolean())
                    .with("formula", Field::formula()),
            ),
        )
        .with("base", Field::boolean())
});

fn activity_base(name: &'static str, kind: &'static str) -> SchemaDefinition {
    SchemaDefinition::new(name)
        .with("type", Field::choice(ACTIVITY_TYPES).with_initial(kind))
        .with("name", Field::string())
}

fn damage_parts() -> Field {
    Field::list(Field::object(DAMAGE_PART.clone()))
}

static ATTACK_ACTIVITY: Lazy<SchemaDefinition> = Lazy::new(|| {
    activity_base("attackActivity", "attack")
        .with(
            "attack",
            Field::object(
                SchemaDefinition::new("attack")
                    .with("ability", Field::string().not_blank().nullable())
                    .with("bonus", Field::formula())
                    .with(
                        "critical",
                        Field::object(
                            SchemaDefinition::new("attackCritical")
                                .with("threshold", Field::integer().positive().nullable()),
                        ),
                    )
                    .with("flat", Field::boolean())
                    .with(
                        "type",
                        Field::object(
                            SchemaDefinition::new("attackType")
                                .with("value", Field::choice(ATTACK_TYPES).nullable())
                                .with(
                                    "classification",
                                    Field::choice(ATTACK_CLASSIFICATIONS).nullable(),
                                ),
                        ),
                    ),
            ),
        )
        .with(
            "damage",
            Field::object(
                SchemaDefinition::new("attackDamage")
                    .with(
                        "critical",
                        Field::object(
                            SchemaDefinition::new("damageCritical").with("bonus", Field::formula()),
                        ),
                    )
                    .with("includeBase", Field::boolean().with_initial(true))
                    .with("parts", damage_parts()),
            ),
        )
});

static DAMAGE_ACTIVITY: Lazy<SchemaDefinition> = Lazy::new(|| {
    activity_base("damageActivity", "damage").with(
        "damage",
        Field::object(
            SchemaDefinition::new("damage")
                .with(
                    "critical",
                    Field::object(
                        SchemaDefinition::new("damageCritical")
                            .with("allow", Field::boolean())
                            .with("bonus", Field::formula()),
                    ),
                )
                .with("parts", damage_parts()),
        ),
    )
});

static UTILITY_ACTIVITY: Lazy<SchemaDefinition> = Lazy::new(|| {
    activity_base("utilityActivity", "utility").with(
        "roll",
        Field::object(
            SchemaDefinition::new("utilityRoll")
                .with("formula", Field::formula())
                .with("name", Field::string())
                .with("prompt", Field::boolean()),
        ),
    )
});

static ITEM: Lazy<SchemaDefinition> = Lazy::new(|| {
    SchemaDefinition::new("item")
        .with("name", Field::string())
        .with("type", Field::choice(ITEM_TYPES))
        .with("weaponType", Field::choice(WEAPON_TYPES).nullable())
        .with("baseItem", Field::string())
        .with(
            "damage",
            Field::object(
                SchemaDefinition::new("itemDamage")
                    .with("base", Field::object(DAMAGE_PART.clone()).nullable())
                    .with("versatile", Field::object(DAMAGE_PART.clone()).nullable()),
            ),
        )
        .with("magicalBonus", Field::integer().min(0.0).nullable())
        .with("properties", Field::set(Field::string().not_blank()))
        .with("attunement", Field::boolean())
        .with("attuned", Field::boolean())
        .with(
            "critical",
            Field::object(
                SchemaDefinition::new("itemCritical")
                    .with("threshold", Field::integer().positive().nullable())
                    .with("damage", Field::formula()),
            ),
        )
        .with("proficient", Field::number().min(0.0).max(2.0).nullable())
        .with("abilityOverride", Field::set(Field::string().not_blank()))
        .with("quantity", Field::integer().min(0.0).with_initial(1))
});

static ACTOR: Lazy<SchemaDefinition> = Lazy::new(|| {
    SchemaDefinition::new("actor")
        .with("name", Field::string())
        .with("type", Field::choice(ACTOR_TYPES))
        .with("level", Field::integer().min(0.0).with_initial(1))
        .with(
            "abilities",
            Field::map(Field::object(
                SchemaDefinition::new("ability")
                    .with("value", Field::integer().min(0.0).with_initial(10)),
            )),
        )
        .with(
            "bonuses",
            Field::map(Field::object(
                SchemaDefinition::new("actionBonuses")
                    .with("attack", Field::formula())
                    .with("damage", Field::formula()),
            )),
        )
        .with("proficiency", Field::integer().min(0.0).nullable())
        .with("spellcasting", Field::string().not_blank().nullable())
        .with(
            "classes",
            Field::list(Field::object(
                SchemaDefinition::new("class")
                    .with("identifier", Field::string())
                    .with("spellcasting", Field::string().not_blank().nullable()),
            )),
        )
        .with("weaponProficiencies", Field::set(Field::string().not_blank()))
        .with(
            "flags",
            Field::object(
                SchemaDefinition::new("actorFlags")
                    .with("meleeCriticalDamageDice", Field::integer().min(0.0).nullable()),
            ),
        )
});

pub fn damage_part_schema() -> &'static SchemaDefinition {
    &DAMAGE_PART
}

pub fn attack_activity_schema() -> &'static SchemaDefinition {
    &ATTACK_ACTIVITY
}

pub fn damage_activity_schema() -> &'static SchemaDefinition {
    &DAMAGE_ACTIVITY
}

pub fn utility_activity_schema() -> &'static SchemaDefinition {
    &UTILITY_ACTIVITY
}

/// Schema for an activity `type` string.
pub fn activity_schema_for(kind: &str) -> Option<&'static SchemaDefinition> {
    match kind {
        "attack" => Some(&*ATTACK_ACTIVITY),
        "damage" => Some(&*DAMAGE_ACTIVITY),
        "utility" => Some(&*UTILITY_ACTIVITY),
        _ => None,
    }
}

pub fn item_schema() -> &'static SchemaDefinition {
    &ITEM
}

pub fn actor_schema() -> &'static SchemaDefinition {
    &ACTOR
}
