//! Damage rolls shared by all activity kinds, and the damage-only kind.

use serde::{Deserialize, Serialize};

use super::{ActivityContext, ActivityOutput, DamageLabel};
use crate::common::set_if_absent;
use crate::entities::DamagePart;
use crate::error::DomainError;
use crate::formula::{join_terms, Formula, SimplifyOptions};
use crate::roll_data::{RollContext, RollValues};
use crate::rules::ActionTypeCode;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollCritical {
    pub allow: bool,
    /// Extra dice added on a critical hit. Metadata only.
    pub bonus_dice: Option<u32>,
    pub bonus_damage: String,
}

/// Static metadata for one damage roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageRollConfig {
    pub parts: Vec<String>,
    pub data: RollValues,
    pub damage_type: Option<String>,
    pub types: Vec<String>,
    /// Built from the item's base damage part.
    pub base: bool,
    pub critical: RollCritical,
}

impl DamageRollConfig {
    pub fn formula(&self) -> String {
        join_terms(&self.parts)
    }

    pub fn label(&self, ctx: &ActivityContext<'_>) -> Result<DamageLabel, DomainError> {
        let mut context = RollContext::new(ctx.scope());
        for (name, value) in self.data.iter() {
            context.bind(name, value);
        }
        let formula = ctx.render(&self.formula(), &context, SimplifyOptions::default())?;
        Ok(DamageLabel {
            formula,
            damage_type: self.damage_type.clone(),
            types: self.types.clone(),
            base: self.base,
        })
    }
}

/// The part's own formula. The first part also carries the actor's damage
/// bonus for `code`.
pub(crate) fn roll_for_part(
    part: &DamagePart,
    index: usize,
    ctx: &ActivityContext<'_>,
    code: Option<ActionTypeCode>,
    data: RollValues,
) -> DamageRollConfig {
    let mut parts = Vec::new();
    let formula = part.formula();
    if !formula.is_empty() {
        parts.push(formula);
    }
    if index == 0 {
        let bonus = ctx
            .actor
            .zip(code)
            .and_then(|(actor, code)| actor.damage_bonus(code));
        if let Some(bonus) = bonus {
            parts.push(bonus.to_string());
        }
    }
    DamageRollConfig {
        parts,
        data,
        damage_type: part.types.first().cloned(),
        types: part.types.clone(),
        base: part.base,
        critical: RollCritical::default(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageCritical {
    pub allow: bool,
    pub bonus: Formula,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    pub critical: DamageCritical,
    pub parts: Vec<DamagePart>,
}

/// Rolls damage without an attack roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageActivity {
    pub damage: DamageConfig,
}

impl DamageActivity {
    pub fn prepare_derived(&mut self, output: &mut ActivityOutput) {
        let parts: Vec<DamagePart> = self
            .damage
            .parts
            .iter()
            .cloned()
            .map(|mut part| {
                part.base = false;
                part
            })
            .collect();
        set_if_absent(&mut output.damage_parts, || parts);
    }

    pub fn prepare_final(
        &self,
        ctx: &ActivityContext<'_>,
        output: &mut ActivityOutput,
    ) -> Result<(), DomainError> {
        let rolls = self.damage_rolls(ctx, &output.damage_parts);
        output.labels.damage = rolls
            .iter()
            .map(|roll| roll.label(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        output.damage = rolls;
        Ok(())
    }

    pub fn damage_rolls(
        &self,
        ctx: &ActivityContext<'_>,
        parts: &[DamagePart],
    ) -> Vec<DamageRollConfig> {
        let mut rolls: Vec<DamageRollConfig> = parts
            .iter()
            .enumerate()
            .map(|(index, part)| roll_for_part(part, index, ctx, None, RollValues::new()))
            .collect();
        for roll in &mut rolls {
            roll.critical.allow = self.damage.critical.allow;
        }
        if let Some(first) = rolls.first_mut() {
            first.critical.bonus_damage = self.damage.critical.bonus.to_string();
        }
        rolls
    }
}
