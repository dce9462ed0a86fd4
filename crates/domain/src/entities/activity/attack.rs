//! Attack activities: ability selection, critical threshold, the attack
//! bonus formula and weapon damage.

use serde::{Deserialize, Serialize};

use super::damage::{roll_for_part, DamageRollConfig};
use super::{ActivityContext, ActivityOutput};
use crate::common::{none_if_blank, set_if_absent};
use crate::entities::{Actor, DamagePart, Item};
use crate::error::DomainError;
use crate::formula::{format_modifier, join_terms, to_hit_label, Formula, SimplifyOptions};
use crate::roll_data::{RollContext, RollValues};
use crate::rules::{
    ActionTypeCode, AttackClassification, AttackMode, AttackType, RulesTables,
};

/// Written as `attack.ability = "none"` to opt out of any ability.
pub const NO_ABILITY: &str = "none";

/// The ability an attack uses. `None` is a configuration gap (no ability
/// applies), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "Option<String>")]
pub enum AbilitySelection {
    None,
    Ability(String),
}

impl AbilitySelection {
    pub fn from_id(ability: &str) -> Self {
        match none_if_blank(ability) {
            None | Some(NO_ABILITY) => Self::None,
            Some(id) => Self::Ability(id.to_string()),
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Ability(id) => Some(id),
        }
    }
}

impl From<AbilitySelection> for Option<String> {
    fn from(value: AbilitySelection) -> Self {
        match value {
            AbilitySelection::None => None,
            AbilitySelection::Ability(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackCritical {
    pub threshold: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackTypeConfig {
    pub value: Option<AttackType>,
    pub classification: Option<AttackClassification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    pub ability: Option<String>,
    pub bonus: Formula,
    pub critical: AttackCritical,
    /// Only `bonus` applies; computed modifiers are suppressed.
    pub flat: bool,
    #[serde(rename = "type")]
    pub kind: AttackTypeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackDamageCritical {
    pub bonus: Formula,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttackDamageConfig {
    pub critical: AttackDamageCritical,
    pub include_base: bool,
    pub parts: Vec<DamagePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackActivity {
    pub attack: AttackConfig,
    pub damage: AttackDamageConfig,
}

/// Static metadata for the attack roll; the host rolls it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRollConfig {
    pub parts: Vec<String>,
    /// Values bound for `parts` (`mod`, `prof`).
    pub data: RollValues,
    pub critical_threshold: u32,
    pub ability: AbilitySelection,
    pub action_type: ActionTypeCode,
}

impl AttackActivity {
    /// Backfill attack type and classification from the item, and stage the
    /// damage parts with the item's base damage first.
    pub fn prepare_derived(&mut self, item: Option<&Item>, output: &mut ActivityOutput) {
        if let Some(item) = item {
            let value = item.derived.attack_type;
            let classification = item.derived.classification;
            set_if_absent(&mut self.attack.kind.value, || value);
            set_if_absent(&mut self.attack.kind.classification, || classification);
        }
        let parts = self.prepared_parts(item);
        set_if_absent(&mut output.damage_parts, || parts);
    }

    fn prepared_parts(&self, item: Option<&Item>) -> Vec<DamagePart> {
        let mut parts = Vec::with_capacity(self.damage.parts.len() + 1);
        let base = item
            .filter(|item| self.damage.include_base && item.offers_base_damage())
            .and_then(Item::base_damage);
        if let Some(base) = base {
            let mut base = base.clone();
            base.base = true;
            parts.push(base);
        }
        parts.extend(self.damage.parts.iter().cloned().map(|mut part| {
            part.base = false;
            part
        }));
        parts
    }

    /// Thrown attacks count as ranged.
    pub fn action_type(&self, attack_mode: AttackMode) -> ActionTypeCode {
        let value = if attack_mode.is_thrown() {
            Some(AttackType::Ranged)
        } else {
            self.attack.kind.value
        };
        ActionTypeCode::from_parts(value, self.attack.kind.classification)
    }

    pub fn available_abilities(
        &self,
        item: Option<&Item>,
        actor: Option<&Actor>,
        rules: &RulesTables,
    ) -> Vec<String> {
        if let Some(item) = item.filter(|item| !item.derived.ability_override.is_empty()) {
            return item.derived.ability_override.clone();
        }
        if self.attack.kind.classification == Some(AttackClassification::Spell) {
            return actor.map(Actor::spellcasting_abilities).unwrap_or_default();
        }
        if actor.is_some_and(Actor::is_npc) {
            let mut abilities = vec![rules.default_melee_ability.clone()];
            if rules.default_ranged_ability != rules.default_melee_ability {
                abilities.push(rules.default_ranged_ability.clone());
            }
            return abilities;
        }
        let attack_type = self.attack.kind.value.unwrap_or(AttackType::Melee);
        vec![rules.default_ability(attack_type).to_string()]
    }

    /// Explicit ability, else the best available one. Ties keep the first
    /// candidate; without an actor the first candidate wins.
    pub fn resolved_ability(
        &self,
        item: Option<&Item>,
        actor: Option<&Actor>,
        rules: &RulesTables,
    ) -> AbilitySelection {
        if let Some(ability) = &self.attack.ability {
            return AbilitySelection::from_id(ability);
        }
        let mut candidates = self.available_abilities(item, actor, rules).into_iter();
        let Some(mut best) = candidates.next() else {
            return AbilitySelection::None;
        };
        if let Some(actor) = actor {
            let mut best_modifier = actor.ability_modifier(&best).unwrap_or(i32::MIN);
            for candidate in candidates {
                let modifier = actor.ability_modifier(&candidate).unwrap_or(i32::MIN);
                if modifier > best_modifier {
                    best = candidate;
                    best_modifier = modifier;
                }
            }
        }
        AbilitySelection::Ability(best)
    }

    /// Lowest of the activity, item and ammunition overrides; the rules
    /// default when none is set.
    pub fn critical_threshold(
        &self,
        item: Option<&Item>,
        ammunition: Option<u32>,
        rules: &RulesTables,
    ) -> u32 {
        [
            self.attack.critical.threshold,
            item.and_then(|item| item.critical.threshold),
            ammunition,
        ]
        .into_iter()
        .map(|threshold| threshold.unwrap_or(u32::MAX))
        .min()
        .filter(|threshold| *threshold != u32::MAX)
        .unwrap_or(rules.critical_threshold)
    }

    /// Ordered attack terms. Values referenced by the terms are bound on
    /// `context`.
    pub fn attack_terms(
        &self,
        ctx: &ActivityContext<'_>,
        ability: &AbilitySelection,
        context: &mut RollContext<'_>,
    ) -> Vec<String> {
        let mut terms = Vec::new();
        let code = self.action_type(ctx.attack_mode);

        if let Some(actor) = ctx.actor.filter(|_| !self.attack.flat) {
            if let AbilitySelection::Ability(ability) = ability {
                terms.push("@mod".to_string());
                context.bind("mod", f64::from(actor.ability_modifier(ability).unwrap_or(0)));
            }
            let multiplier = ctx.item.map(Item::proficiency_multiplier).unwrap_or(0.0);
            if multiplier > 0.0 {
                terms.push("@prof".to_string());
                context.bind("prof", (f64::from(actor.proficiency_bonus()) * multiplier).floor());
            }
            if let Some(bonus) = actor.attack_bonus(code) {
                terms.push(bonus.to_string());
            }
        }

        if !self.attack.bonus.is_empty() && !self.attack.bonus.is_zero() {
            terms.push(self.attack.bonus.to_string());
        }

        if !self.attack.flat {
            if let Some(bonus) = ctx.item.and_then(Item::available_magical_bonus) {
                terms.push(bonus.to_string());
            }
        }
        terms
    }

    pub fn prepare_final(
        &self,
        ctx: &ActivityContext<'_>,
        output: &mut ActivityOutput,
    ) -> Result<(), DomainError> {
        let ability = self.resolved_ability(ctx.item, ctx.actor, ctx.rules);
        let mut context = RollContext::new(ctx.scope());
        let terms = self.attack_terms(ctx, &ability, &mut context);
        let formula = join_terms(&terms);

        let modifier = ctx.render(&formula, &context, SimplifyOptions::deterministic())?;
        let to_hit = ctx.render(&formula, &context, SimplifyOptions::default())?;

        let damage = self.damage_rolls(ctx, &output.damage_parts);
        let damage_labels = damage
            .iter()
            .map(|roll| roll.label(ctx))
            .collect::<Result<Vec<_>, _>>()?;

        output.labels.modifier = format_modifier(&modifier);
        output.labels.to_hit = to_hit_label(&to_hit);
        output.labels.damage = damage_labels;
        output.attack = Some(AttackRollConfig {
            parts: terms,
            data: context.bound().clone(),
            critical_threshold: self.critical_threshold(ctx.item, None, ctx.rules),
            ability,
            action_type: self.action_type(ctx.attack_mode),
        });
        output.damage = damage;
        Ok(())
    }

    /// One roll per prepared part. The first roll carries the critical
    /// bonus damage.
    pub fn damage_rolls(
        &self,
        ctx: &ActivityContext<'_>,
        parts: &[DamagePart],
    ) -> Vec<DamageRollConfig> {
        let code = self.action_type(ctx.attack_mode);
        let modifier = match (self.resolved_ability(ctx.item, ctx.actor, ctx.rules), ctx.actor) {
            (AbilitySelection::Ability(ability), Some(actor)) => {
                actor.ability_modifier(&ability).unwrap_or(0)
            }
            _ => 0,
        };

        let mut rolls: Vec<DamageRollConfig> = parts
            .iter()
            .enumerate()
            .map(|(index, part)| self.process_damage_part(part, index, ctx, code, modifier))
            .collect();

        if let Some(first) = rolls.first_mut() {
            let item_bonus = ctx
                .item
                .map(|item| item.critical.damage.as_str())
                .unwrap_or_default();
            first.critical.bonus_damage =
                join_terms(&[self.damage.critical.bonus.as_str(), item_bonus]);
        }
        for roll in &mut rolls {
            roll.critical.allow = true;
        }
        rolls
    }

    fn process_damage_part(
        &self,
        part: &DamagePart,
        index: usize,
        ctx: &ActivityContext<'_>,
        code: ActionTypeCode,
        modifier: i32,
    ) -> DamageRollConfig {
        let mut data = RollValues::new();
        data.set("mod", f64::from(modifier));
        if !part.base {
            return roll_for_part(part, index, ctx, Some(code), data);
        }

        let weapon = ctx.item.filter(|item| item.is_weapon());
        let versatile;
        let part = match weapon {
            Some(item) if item.is_versatile() && ctx.attack_mode == AttackMode::TwoHanded => {
                let mut swapped = item.versatile_damage().cloned().unwrap_or_default();
                swapped.base = true;
                swapped.fill_from(part);
                versatile = swapped;
                &versatile
            }
            _ => part,
        };

        let mut roll = roll_for_part(part, index, ctx, Some(code), data);
        roll.base = true;

        if let Some(item) = weapon {
            let include_mod = !ctx.attack_mode.is_off_hand() || modifier < 0;
            if include_mod && !roll.parts.iter().any(|p| p.contains("@mod")) {
                roll.parts.push("@mod".to_string());
            }
            if let Some(bonus) = item.available_magical_bonus() {
                roll.parts.push("@magicalBonus".to_string());
                roll.data.set("magicalBonus", f64::from(bonus));
            }
        }

        if code == ActionTypeCode::Mwak {
            roll.critical.bonus_dice = ctx.actor.and_then(Actor::melee_critical_damage_dice);
        }
        roll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Activity;
    use crate::formula::StandardSimplifier;
    use crate::ids::{ActivityId, ActorId, ItemId};
    use crate::roll_data::RollData;
    use serde_json::{json, Value};

    struct Fixture {
        actor: Actor,
        item: Item,
        activity: Activity,
        rules: RulesTables,
        roll_data: RollData,
    }

    impl Fixture {
        fn new(actor: Value, item: Value, activity: Value) -> Self {
            let rules = RulesTables::default();
            let mut actor = Actor::from_source(ActorId::new(), &actor).unwrap();
            actor.prepare_derived(&rules);
            let mut item = Item::from_source(ItemId::new(), Some(actor.id), &item).unwrap();
            item.prepare_derived(Some(&actor), &rules);
            let mut activity =
                Activity::from_source(ActivityId::new(), Some(item.id), &activity).unwrap();
            activity.prepare_derived(Some(&item));

            let mut roll_data = RollData::new();
            roll_data.insert_actor(actor.id, actor.roll_values());
            roll_data.insert_item(item.id, item.roll_values());
            Self {
                actor,
                item,
                activity,
                rules,
                roll_data,
            }
        }

        fn ctx(&self, attack_mode: AttackMode) -> ActivityContext<'_> {
            ActivityContext {
                item: Some(&self.item),
                actor: Some(&self.actor),
                roll_data: &self.roll_data,
                rules: &self.rules,
                simplifier: &StandardSimplifier,
                attack_mode,
            }
        }

        fn attack(&self) -> &AttackActivity {
            self.activity.as_attack().unwrap()
        }

        fn finalize(&mut self) {
            let mut activity = self.activity.clone();
            activity
                .prepare_final(&self.ctx(AttackMode::OneHanded))
                .unwrap();
            self.activity = activity;
        }
    }

    fn fighter() -> Value {
        json!({
            "name": "Fighter",
            "type": "character",
            "level": 1,
            "abilities": { "str": { "value": 16 }, "dex": { "value": 12 } },
            "bonuses": { "mwak": { "attack": "+1" } },
            "weaponProficiencies": ["mar"]
        })
    }

    fn longsword() -> Value {
        json!({
            "name": "Longsword +1",
            "type": "weapon",
            "weaponType": "martialM",
            "damage": {
                "base": { "number": 1, "denomination": 8, "types": ["slashing"] },
                "versatile": { "types": [] }
            },
            "magicalBonus": 1,
            "properties": ["mgc", "ver"]
        })
    }

    fn attack() -> Value {
        json!({ "type": "attack", "name": "Swing", "attack": { "bonus": "+0" } })
    }

    #[test]
    fn test_canonical_attack_terms_and_labels() {
        let mut fixture = Fixture::new(fighter(), longsword(), attack());
        fixture.finalize();
        let output = &fixture.activity.output;
        let roll = output.attack.as_ref().unwrap();
        assert_eq!(roll.parts, vec!["@mod", "@prof", "+1", "1"]);
        assert_eq!(roll.data.get("mod"), Some(3.0));
        assert_eq!(roll.data.get("prof"), Some(2.0));
        assert_eq!(roll.action_type, ActionTypeCode::Mwak);
        assert_eq!(roll.ability, AbilitySelection::Ability("str".into()));
        assert_eq!(output.labels.modifier, "+7");
        assert_eq!(output.labels.to_hit, "+ 7");
    }

    #[test]
    fn test_flat_attack_keeps_only_explicit_bonus() {
        let activity = json!({ "type": "attack", "attack": { "flat": true, "bonus": "2" } });
        let mut fixture = Fixture::new(fighter(), longsword(), activity);
        fixture.finalize();
        let output = &fixture.activity.output;
        assert_eq!(output.attack.as_ref().unwrap().parts, vec!["2"]);
        assert_eq!(output.labels.modifier, "+2");
        assert_eq!(output.labels.to_hit, "+ 2");
    }

    #[test]
    fn test_flat_attack_never_has_computed_terms() {
        for actor in [fighter(), json!({ "type": "npc", "abilities": { "str": { "value": 20 } } })] {
            let activity = json!({ "type": "attack", "attack": { "flat": true } });
            let fixture = Fixture::new(actor, longsword(), activity);
            let ctx = fixture.ctx(AttackMode::OneHanded);
            let mut context = RollContext::new(ctx.scope());
            let ability = fixture.attack().resolved_ability(ctx.item, ctx.actor, ctx.rules);
            let terms = fixture.attack().attack_terms(&ctx, &ability, &mut context);
            assert!(terms.is_empty());
            assert!(context.bound().is_empty());
        }
    }

    #[test]
    fn test_no_actor_means_no_actor_terms() {
        let fixture = Fixture::new(fighter(), longsword(), attack());
        let mut ctx = fixture.ctx(AttackMode::OneHanded);
        ctx.actor = None;
        let mut context = RollContext::new(ctx.scope());
        let ability = fixture.attack().resolved_ability(ctx.item, None, ctx.rules);
        assert_eq!(ability, AbilitySelection::Ability("str".into()));
        let terms = fixture.attack().attack_terms(&ctx, &ability, &mut context);
        assert_eq!(terms, vec!["1"]);
    }

    #[test]
    fn test_negative_result_keeps_sign() {
        let actor = json!({ "abilities": { "str": { "value": 6 } } });
        let item = json!({ "type": "weapon", "weaponType": "simpleM" });
        let mut fixture = Fixture::new(actor, item, attack());
        fixture.finalize();
        assert_eq!(fixture.activity.output.labels.modifier, "-2");
        assert_eq!(fixture.activity.output.labels.to_hit, "-2");
    }

    #[test]
    fn test_npc_gets_both_default_abilities() {
        let npc = json!({
            "type": "npc",
            "abilities": { "str": { "value": 10 }, "dex": { "value": 18 } }
        });
        let ranged = json!({ "type": "attack", "attack": { "type": { "value": "ranged" } } });
        for activity in [attack(), ranged] {
            let fixture = Fixture::new(npc.clone(), longsword(), activity);
            let abilities =
                fixture
                    .attack()
                    .available_abilities(Some(&fixture.item), Some(&fixture.actor), &fixture.rules);
            assert_eq!(abilities, vec!["str", "dex"]);
        }
        let fixture = Fixture::new(npc, longsword(), attack());
        assert_eq!(
            fixture
                .attack()
                .resolved_ability(Some(&fixture.item), Some(&fixture.actor), &fixture.rules),
            AbilitySelection::Ability("dex".into())
        );
    }

    #[test]
    fn test_player_gets_single_ability_by_attack_type() {
        let ranged = json!({ "type": "attack", "attack": { "type": { "value": "ranged" } } });
        let fixture = Fixture::new(fighter(), longsword(), ranged);
        let abilities =
            fixture
                .attack()
                .available_abilities(Some(&fixture.item), Some(&fixture.actor), &fixture.rules);
        assert_eq!(abilities, vec!["dex"]);
    }

    #[test]
    fn test_finesse_picks_higher_modifier_and_ties_keep_first() {
        let mut item = longsword();
        item["properties"] = json!(["fin"]);
        let rogue = json!({ "abilities": { "str": { "value": 10 }, "dex": { "value": 16 } } });
        let fixture = Fixture::new(rogue, item.clone(), attack());
        let resolved = fixture
            .attack()
            .resolved_ability(Some(&fixture.item), Some(&fixture.actor), &fixture.rules);
        assert_eq!(resolved, AbilitySelection::Ability("dex".into()));

        let even = json!({ "abilities": { "str": { "value": 14 }, "dex": { "value": 15 } } });
        let fixture = Fixture::new(even, item, attack());
        let resolved = fixture
            .attack()
            .resolved_ability(Some(&fixture.item), Some(&fixture.actor), &fixture.rules);
        assert_eq!(resolved, AbilitySelection::Ability("str".into()));
    }

    #[test]
    fn test_spell_abilities_and_resolution_gap() {
        let spell = json!({ "type": "spell" });
        let activity = json!({ "type": "attack", "attack": { "type": { "value": "ranged" } } });

        let wizard = json!({
            "abilities": { "int": { "value": 16 }, "wis": { "value": 12 } },
            "classes": [{ "spellcasting": "int" }, { "spellcasting": "wis" }, { "spellcasting": "int" }]
        });
        let fixture = Fixture::new(wizard, spell.clone(), activity.clone());
        assert_eq!(fixture.attack().attack.kind.classification, Some(AttackClassification::Spell));
        assert_eq!(
            fixture
                .attack()
                .available_abilities(Some(&fixture.item), Some(&fixture.actor), &fixture.rules),
            vec!["int", "wis"]
        );
        assert_eq!(fixture.attack().action_type(AttackMode::OneHanded), ActionTypeCode::Rsak);

        let mut fixture = Fixture::new(json!({}), spell, activity);
        let ability = fixture
            .attack()
            .resolved_ability(Some(&fixture.item), Some(&fixture.actor), &fixture.rules);
        assert_eq!(ability, AbilitySelection::None);
        fixture.finalize();
        let roll = fixture.activity.output.attack.as_ref().unwrap();
        assert_eq!(roll.parts, vec!["@prof"]);
        assert_eq!(fixture.activity.output.labels.modifier, "+2");
    }

    #[test]
    fn test_explicit_ability() {
        let activity = json!({ "type": "attack", "attack": { "ability": "con" } });
        let fixture = Fixture::new(fighter(), longsword(), activity);
        assert_eq!(
            fixture.attack().resolved_ability(None, None, &fixture.rules),
            AbilitySelection::Ability("con".into())
        );
        let activity = json!({ "type": "attack", "attack": { "ability": "none" } });
        let fixture = Fixture::new(fighter(), longsword(), activity);
        assert_eq!(
            fixture.attack().resolved_ability(None, None, &fixture.rules),
            AbilitySelection::None
        );
    }

    #[test]
    fn test_critical_threshold() {
        let activity = json!({ "type": "attack", "attack": { "critical": { "threshold": 19 } } });
        let fixture = Fixture::new(fighter(), json!({ "type": "weapon" }), activity);
        assert_eq!(fixture.attack().critical_threshold(Some(&fixture.item), None, &fixture.rules), 19);

        let fixture = Fixture::new(fighter(), json!({ "type": "weapon" }), attack());
        assert_eq!(fixture.attack().critical_threshold(Some(&fixture.item), None, &fixture.rules), 20);
        assert_eq!(fixture.attack().critical_threshold(None, Some(18), &fixture.rules), 18);

        let item = json!({ "type": "weapon", "critical": { "threshold": 18 } });
        let activity = json!({ "type": "attack", "attack": { "critical": { "threshold": 19 } } });
        let fixture = Fixture::new(fighter(), item, activity);
        assert_eq!(fixture.attack().critical_threshold(Some(&fixture.item), None, &fixture.rules), 18);
    }

    #[test]
    fn test_derived_backfills_type_without_overwriting() {
        let fixture = Fixture::new(fighter(), longsword(), attack());
        assert_eq!(fixture.attack().attack.kind.value, Some(AttackType::Melee));
        assert_eq!(fixture.attack().attack.kind.classification, Some(AttackClassification::Weapon));

        let ranged = json!({ "type": "attack", "attack": { "type": { "value": "ranged" } } });
        let fixture = Fixture::new(fighter(), longsword(), ranged);
        assert_eq!(fixture.attack().attack.kind.value, Some(AttackType::Ranged));
    }

    #[test]
    fn test_derived_phase_is_idempotent() {
        let fixture = Fixture::new(fighter(), longsword(), attack());
        let mut twice = fixture.activity.clone();
        twice.prepare_derived(Some(&fixture.item));
        assert_eq!(twice, fixture.activity);
    }

    #[test]
    fn test_base_part_first_and_tagged() {
        let activity = json!({
            "type": "attack",
            "damage": { "parts": [{ "number": 1, "denomination": 6, "types": ["fire"], "base": true }] }
        });
        let fixture = Fixture::new(fighter(), longsword(), activity);
        let parts = &fixture.activity.output.damage_parts;
        assert_eq!(parts.len(), 2);
        assert!(parts[0].base);
        assert_eq!(parts[0].denomination, Some(8));
        assert!(!parts[1].base);

        let activity = json!({ "type": "attack", "damage": { "includeBase": false } });
        let fixture = Fixture::new(fighter(), longsword(), activity);
        assert!(fixture.activity.output.damage_parts.is_empty());
    }

    #[test]
    fn test_weapon_base_damage_roll() {
        let fixture = Fixture::new(fighter(), longsword(), attack());
        let rolls = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::OneHanded));
        assert_eq!(rolls.len(), 1);
        assert!(rolls[0].base);
        assert_eq!(rolls[0].parts, vec!["1d8", "@mod", "@magicalBonus"]);
        assert_eq!(rolls[0].data.get("mod"), Some(3.0));
        assert_eq!(rolls[0].data.get("magicalBonus"), Some(1.0));
        assert_eq!(rolls[0].types, vec!["slashing"]);
        assert!(rolls[0].critical.allow);
    }

    #[test]
    fn test_versatile_swap_fills_from_original() {
        let fixture = Fixture::new(fighter(), longsword(), attack());
        let rolls = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::TwoHanded));
        assert_eq!(rolls[0].parts[0], "1d8");
        assert_eq!(rolls[0].types, vec!["slashing"]);
        assert!(rolls[0].base);

        let mut item = longsword();
        item["damage"]["versatile"] = json!({ "denomination": 10 });
        let fixture = Fixture::new(fighter(), item, attack());
        let rolls = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::TwoHanded));
        assert_eq!(rolls[0].parts[0], "1d10");
        let one_handed = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::OneHanded));
        assert_eq!(one_handed[0].parts[0], "1d8");
        assert_eq!(
            fixture.item.versatile_damage().unwrap().number,
            None,
            "the stored versatile part is never filled in"
        );
    }

    #[test]
    fn test_off_hand_drops_positive_modifier_only() {
        let fixture = Fixture::new(fighter(), longsword(), attack());
        let rolls = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::OffHand));
        assert_eq!(rolls[0].parts, vec!["1d8", "@magicalBonus"]);

        let weak = json!({ "abilities": { "str": { "value": 8 } }, "weaponProficiencies": ["mar"] });
        let fixture = Fixture::new(weak, longsword(), attack());
        let rolls = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::OffHand));
        assert_eq!(rolls[0].parts, vec!["1d8", "@mod", "@magicalBonus"]);
        assert_eq!(rolls[0].data.get("mod"), Some(-1.0));
    }

    #[test]
    fn test_mod_is_not_duplicated() {
        let mut item = longsword();
        item["damage"]["base"]["bonus"] = json!("@mod");
        let fixture = Fixture::new(fighter(), item, attack());
        let rolls = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::OneHanded));
        assert_eq!(rolls[0].parts, vec!["1d8 + @mod", "@magicalBonus"]);
    }

    #[test]
    fn test_melee_critical_dice_for_mwak_only() {
        let mut actor = fighter();
        actor["flags"] = json!({ "meleeCriticalDamageDice": 2 });
        let fixture = Fixture::new(actor, longsword(), attack());
        let melee = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::OneHanded));
        assert_eq!(melee[0].critical.bonus_dice, Some(2));
        assert_eq!(melee[0].parts, vec!["1d8", "@mod", "@magicalBonus"]);
        let thrown = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::Thrown));
        assert_eq!(thrown[0].critical.bonus_dice, None);
    }

    #[test]
    fn test_critical_bonus_and_actor_damage_bonus_on_first_roll() {
        let mut actor = fighter();
        actor["bonuses"]["mwak"]["damage"] = json!("2");
        let mut item = longsword();
        item["critical"] = json!({ "damage": "1d8" });
        let activity = json!({
            "type": "attack",
            "damage": {
                "critical": { "bonus": "1d6" },
                "parts": [{ "number": 1, "denomination": 4, "types": ["fire"] }]
            }
        });
        let mut fixture = Fixture::new(actor, item, activity);
        fixture.finalize();
        let output = &fixture.activity.output;
        assert_eq!(output.damage.len(), 2);
        assert_eq!(output.damage[0].parts, vec!["1d8", "2", "@mod", "@magicalBonus"]);
        assert_eq!(output.damage[0].critical.bonus_damage, "1d6 + 1d8");
        assert_eq!(output.damage[1].parts, vec!["1d4"]);
        assert_eq!(output.damage[1].critical.bonus_damage, "");
        assert_eq!(output.labels.damage[0].formula, "1d8 + 6");
        assert_eq!(output.labels.damage[0].damage_type.as_deref(), Some("slashing"));
        assert_eq!(output.labels.damage[1].formula, "1d4");
    }

    #[test]
    fn test_modes_do_not_leak_between_calls() {
        let fixture = Fixture::new(fighter(), longsword(), attack());
        let before = fixture.activity.clone();
        let _ = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::TwoHanded));
        let _ = fixture.activity.damage_rolls(&fixture.ctx(AttackMode::OffHand));
        assert_eq!(fixture.activity, before);
    }
}
