//! Activities - the usable actions of an item.
//!
//! Each kind is a variant of [`ActivityKind`] with its own schema and its
//! own preparation steps; [`Activity`] holds what all kinds share and
//! dispatches to them.

mod attack;
mod damage;
mod utility;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use attack::{
    AbilitySelection, AttackActivity, AttackConfig, AttackCritical, AttackDamageConfig,
    AttackDamageCritical, AttackRollConfig, AttackTypeConfig,
};
pub use damage::{DamageActivity, DamageConfig, DamageCritical, DamageRollConfig, RollCritical};
pub use utility::{UtilityActivity, UtilityRoll};

use super::{Actor, DamagePart, Item};
use crate::error::{DomainError, FieldFailure, SchemaError};
use crate::formula::{replace_formula_data, FormulaSimplifier, SimplifyOptions};
use crate::ids::{ActivityId, ItemId};
use crate::roll_data::{RollContext, RollData, RollScope};
use crate::rules::{ActionTypeCode, AttackMode, RulesTables};
use crate::schema::{activity_schema_for, SchemaDefinition, ACTIVITY_TYPES};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityKind {
    Attack(AttackActivity),
    Damage(DamageActivity),
    Utility(UtilityActivity),
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack(_) => "attack",
            Self::Damage(_) => "damage",
            Self::Utility(_) => "utility",
        }
    }
}

/// A rendered damage roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageLabel {
    pub formula: String,
    pub damage_type: Option<String>,
    pub types: Vec<String>,
    pub base: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLabels {
    /// Deterministic attack bonus, e.g. `+7`.
    pub modifier: String,
    /// Attack formula for display, e.g. `+ 1d4 + 5`.
    pub to_hit: String,
    pub damage: Vec<DamageLabel>,
    pub roll: String,
}

/// Computed state. Rebuilt by every pass, never written back to the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOutput {
    /// Damage parts with the item's base part (if any) first.
    pub damage_parts: Vec<DamagePart>,
    pub labels: ActivityLabels,
    pub attack: Option<AttackRollConfig>,
    pub damage: Vec<DamageRollConfig>,
}

/// What an activity may read during its final phase.
#[derive(Clone, Copy)]
pub struct ActivityContext<'a> {
    pub item: Option<&'a Item>,
    pub actor: Option<&'a Actor>,
    pub roll_data: &'a RollData,
    pub rules: &'a RulesTables,
    pub simplifier: &'a dyn FormulaSimplifier,
    pub attack_mode: AttackMode,
}

impl<'a> ActivityContext<'a> {
    pub fn scope(&self) -> RollScope<'a> {
        self.roll_data
            .scope(self.actor.map(|a| a.id), self.item.map(|i| i.id))
    }

    pub fn with_attack_mode(self, attack_mode: AttackMode) -> Self {
        Self {
            attack_mode,
            ..self
        }
    }

    /// Substitute roll data (plus `context` bindings) and simplify.
    pub(crate) fn render(
        &self,
        formula: &str,
        context: &RollContext<'_>,
        options: SimplifyOptions,
    ) -> Result<String, DomainError> {
        let substituted = replace_formula_data(formula, context);
        Ok(self.simplifier.simplify(&substituted, options)?)
    }
}

#[derive(Debug, Deserialize)]
struct ActivityRecord<K> {
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    data: K,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub item: Option<ItemId>,
    pub name: String,
    #[serde(flatten)]
    pub kind: ActivityKind,
    pub output: ActivityOutput,
}

impl Activity {
    /// Validate a raw record against the schema of its `type`.
    pub fn from_source(id: ActivityId, item: Option<ItemId>, raw: &Value) -> Result<Self, SchemaError> {
        let kind = kind_name(raw)?;
        let (activity, _) = Self::decode(id, item, kind, raw, false)?;
        Ok(activity)
    }

    /// Invalid fields fall back to defaults. An unknown `type` decodes as
    /// a utility activity.
    pub fn from_source_lenient(
        id: ActivityId,
        item: Option<ItemId>,
        raw: &Value,
    ) -> Result<(Self, Vec<FieldFailure>), SchemaError> {
        match kind_name(raw) {
            Ok(kind) => Self::decode(id, item, kind, raw, true),
            Err(err) => {
                let (activity, mut failures) = Self::decode(id, item, "utility", raw, true)?;
                failures.retain(|f| f.path != "type");
                failures.splice(0..0, err.failures().iter().cloned());
                Ok((activity, failures))
            }
        }
    }

    fn decode(
        id: ActivityId,
        item: Option<ItemId>,
        kind: &str,
        raw: &Value,
        lenient: bool,
    ) -> Result<(Self, Vec<FieldFailure>), SchemaError> {
        let schema = activity_schema_for(kind)
            .ok_or_else(|| SchemaError::single("type", unknown_type_message()))?;
        let (name, kind, failures) = match kind {
            "attack" => decode_record(schema, raw, lenient, ActivityKind::Attack)?,
            "damage" => decode_record(schema, raw, lenient, ActivityKind::Damage)?,
            _ => decode_record(schema, raw, lenient, ActivityKind::Utility)?,
        };
        let activity = Self {
            id,
            item,
            name,
            kind,
            output: ActivityOutput::default(),
        };
        Ok((activity, failures))
    }

    /// Fill unset fields from the owning item. Fill-if-empty, idempotent.
    pub fn prepare_derived(&mut self, item: Option<&Item>) {
        match &mut self.kind {
            ActivityKind::Attack(attack) => attack.prepare_derived(item, &mut self.output),
            ActivityKind::Damage(damage) => damage.prepare_derived(&mut self.output),
            ActivityKind::Utility(_) => {}
        }
    }

    /// Compute labels and roll configs. Output is replaced only when every
    /// step succeeds.
    pub fn prepare_final(&mut self, ctx: &ActivityContext<'_>) -> Result<(), DomainError> {
        let mut output = ActivityOutput {
            damage_parts: self.output.damage_parts.clone(),
            ..ActivityOutput::default()
        };
        match &self.kind {
            ActivityKind::Attack(attack) => attack.prepare_final(ctx, &mut output)?,
            ActivityKind::Damage(damage) => damage.prepare_final(ctx, &mut output)?,
            ActivityKind::Utility(utility) => utility.prepare_final(ctx, &mut output)?,
        }
        self.output = output;
        Ok(())
    }

    /// Ability used by the activity's rolls.
    pub fn ability(&self, ctx: &ActivityContext<'_>) -> AbilitySelection {
        match &self.kind {
            ActivityKind::Attack(attack) => attack.resolved_ability(ctx.item, ctx.actor, ctx.rules),
            _ => AbilitySelection::None,
        }
    }

    /// Action-type code for the given attack mode; attacks only.
    pub fn action_type(&self, attack_mode: AttackMode) -> Option<ActionTypeCode> {
        match &self.kind {
            ActivityKind::Attack(attack) => Some(attack.action_type(attack_mode)),
            _ => None,
        }
    }

    /// Damage rolls for `ctx.attack_mode`, built from private copies of the
    /// prepared parts.
    pub fn damage_rolls(&self, ctx: &ActivityContext<'_>) -> Vec<DamageRollConfig> {
        match &self.kind {
            ActivityKind::Attack(attack) => attack.damage_rolls(ctx, &self.output.damage_parts),
            ActivityKind::Damage(damage) => damage.damage_rolls(ctx, &self.output.damage_parts),
            ActivityKind::Utility(_) => Vec::new(),
        }
    }

    pub fn as_attack(&self) -> Option<&AttackActivity> {
        match &self.kind {
            ActivityKind::Attack(attack) => Some(attack),
            _ => None,
        }
    }
}

fn unknown_type_message() -> String {
    format!("must be one of: {}", ACTIVITY_TYPES.join(", "))
}

fn kind_name(raw: &Value) -> Result<&str, SchemaError> {
    match raw.get("type") {
        None | Some(Value::Null) => Err(SchemaError::single("type", "is required")),
        Some(Value::String(kind)) if ACTIVITY_TYPES.contains(&kind.trim()) => Ok(kind.trim()),
        Some(_) => Err(SchemaError::single("type", unknown_type_message())),
    }
}

fn decode_record<K: DeserializeOwned>(
    schema: &SchemaDefinition,
    raw: &Value,
    lenient: bool,
    wrap: fn(K) -> ActivityKind,
) -> Result<(String, ActivityKind, Vec<FieldFailure>), SchemaError> {
    let (record, failures): (ActivityRecord<K>, _) = if lenient {
        schema.decode_lenient(raw)?
    } else {
        (schema.decode(raw)?, Vec::new())
    };
    Ok((record.name, wrap(record.data), failures))
}
