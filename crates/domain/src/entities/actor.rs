//! Actor entity - the root of the entity graph.
//!
//! Actors are loaded by the host; this crate only reads and prepares them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::set_if_absent;
use crate::error::{FieldFailure, SchemaError};
use crate::formula::Formula;
use crate::ids::{ActorId, ItemId};
use crate::roll_data::RollValues;
use crate::rules::{ActionTypeCode, RulesTables};
use crate::schema::actor_schema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    #[default]
    Character,
    Npc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AbilityScore {
    pub value: i32,
    /// Derived from `value`.
    #[serde(rename = "mod", skip_deserializing)]
    pub modifier: Option<i32>,
}

/// Actor-wide bonuses for one action-type code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionBonuses {
    pub attack: Formula,
    pub damage: Formula,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassEntry {
    pub identifier: String,
    /// Spellcasting ability granted by the class.
    pub spellcasting: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActorFlags {
    pub melee_critical_damage_dice: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorDerived {
    pub proficiency: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Actor {
    #[serde(skip_deserializing)]
    pub id: ActorId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActorKind,
    pub level: u32,
    pub abilities: BTreeMap<String, AbilityScore>,
    /// Keyed by action-type code (`mwak`, `rsak`, ...).
    pub bonuses: BTreeMap<String, ActionBonuses>,
    /// Explicit proficiency bonus; derived from level when unset.
    pub proficiency: Option<i32>,
    /// Designated spellcasting ability.
    pub spellcasting: Option<String>,
    pub classes: Vec<ClassEntry>,
    /// Weapon categories (`sim`, `mar`) and base item ids.
    pub weapon_proficiencies: Vec<String>,
    pub flags: ActorFlags,
    #[serde(skip_deserializing)]
    pub items: Vec<ItemId>,
    #[serde(skip_deserializing)]
    pub derived: ActorDerived,
}

impl Actor {
    /// Validate a raw record and build the actor from it.
    pub fn from_source(id: ActorId, raw: &Value) -> Result<Self, SchemaError> {
        let mut actor: Actor = actor_schema().decode(raw)?;
        actor.id = id;
        Ok(actor)
    }

    /// Like [`from_source`](Self::from_source), but invalid fields fall
    /// back to their defaults and are returned.
    pub fn from_source_lenient(
        id: ActorId,
        raw: &Value,
    ) -> Result<(Self, Vec<FieldFailure>), SchemaError> {
        let (mut actor, failures): (Actor, _) = actor_schema().decode_lenient(raw)?;
        actor.id = id;
        Ok((actor, failures))
    }

    /// Ability modifiers and proficiency bonus. Fill-if-empty.
    pub fn prepare_derived(&mut self, rules: &RulesTables) {
        for score in self.abilities.values_mut() {
            let value = score.value;
            set_if_absent(&mut score.modifier, || Some(rules.ability_modifier(value)));
        }
        let proficiency = self
            .proficiency
            .unwrap_or_else(|| rules.proficiency_bonus(self.level));
        set_if_absent(&mut self.derived.proficiency, || Some(proficiency));
    }

    pub fn is_npc(&self) -> bool {
        self.kind == ActorKind::Npc
    }

    /// Current modifier; `None` when the ability is unknown or the derived
    /// phase has not run.
    pub fn ability_modifier(&self, ability: &str) -> Option<i32> {
        self.abilities.get(ability).and_then(|score| score.modifier)
    }

    pub fn proficiency_bonus(&self) -> i32 {
        self.derived.proficiency.unwrap_or(0)
    }

    /// The designated spellcasting ability, else the union over classes in
    /// first-seen order.
    pub fn spellcasting_abilities(&self) -> Vec<String> {
        if let Some(ability) = &self.spellcasting {
            return vec![ability.clone()];
        }
        let mut abilities: Vec<String> = Vec::new();
        for ability in self.classes.iter().filter_map(|c| c.spellcasting.as_ref()) {
            if !abilities.contains(ability) {
                abilities.push(ability.clone());
            }
        }
        abilities
    }

    pub fn attack_bonus(&self, code: ActionTypeCode) -> Option<&Formula> {
        self.bonuses
            .get(code.as_str())
            .map(|b| &b.attack)
            .filter(|f| !f.is_empty() && !f.is_zero())
    }

    pub fn damage_bonus(&self, code: ActionTypeCode) -> Option<&Formula> {
        self.bonuses
            .get(code.as_str())
            .map(|b| &b.damage)
            .filter(|f| !f.is_empty() && !f.is_zero())
    }

    pub fn is_proficient_with(&self, key: &str) -> bool {
        !key.is_empty() && self.weapon_proficiencies.iter().any(|p| p == key)
    }

    /// Positive override only.
    pub fn melee_critical_damage_dice(&self) -> Option<u32> {
        self.flags.melee_critical_damage_dice.filter(|n| *n > 0)
    }

    /// Numeric view for roll data.
    pub fn roll_values(&self) -> RollValues {
        let mut values = RollValues::new();
        for (id, score) in &self.abilities {
            values.set(format!("abilities.{id}.value"), f64::from(score.value));
            if let Some(modifier) = score.modifier {
                values.set(format!("abilities.{id}.mod"), f64::from(modifier));
            }
        }
        let prof = f64::from(self.proficiency_bonus());
        values.set("prof", prof);
        values.set("attributes.prof", prof);
        values.set("details.level", f64::from(self.level));
        values
    }
}
