//! Item entity - owned by one actor, owns activities.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Actor, DamagePart};
use crate::common::set_if_absent;
use crate::error::{FieldFailure, SchemaError};
use crate::formula::Formula;
use crate::ids::{ActivityId, ActorId, ItemId};
use crate::roll_data::RollValues;
use crate::rules::{AttackClassification, AttackType, RulesTables};
use crate::schema::item_schema;

pub const PROPERTY_FINESSE: &str = "fin";
pub const PROPERTY_MAGICAL: &str = "mgc";
pub const PROPERTY_VERSATILE: &str = "ver";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Equipment,
    Weapon,
    Spell,
    Consumable,
    Feat,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponType {
    #[serde(rename = "simpleM")]
    SimpleMelee,
    #[serde(rename = "martialM")]
    MartialMelee,
    #[serde(rename = "simpleR")]
    SimpleRanged,
    #[serde(rename = "martialR")]
    MartialRanged,
    #[serde(rename = "natural")]
    Natural,
    #[serde(rename = "improv")]
    Improvised,
}

impl WeaponType {
    pub fn attack_type(self) -> AttackType {
        match self {
            Self::SimpleRanged | Self::MartialRanged => AttackType::Ranged,
            _ => AttackType::Melee,
        }
    }

    /// Proficiency category key (`sim`, `mar`).
    pub fn category(self) -> Option<&'static str> {
        match self {
            Self::SimpleMelee | Self::SimpleRanged => Some("sim"),
            Self::MartialMelee | Self::MartialRanged => Some("mar"),
            Self::Natural | Self::Improvised => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDamage {
    pub base: Option<DamagePart>,
    /// Two-handed damage for versatile weapons.
    pub versatile: Option<DamagePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemCritical {
    pub threshold: Option<u32>,
    /// Extra damage on a critical hit.
    pub damage: Formula,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDerived {
    pub attack_type: Option<AttackType>,
    pub classification: Option<AttackClassification>,
    pub ability_override: Vec<String>,
    /// 0 (not proficient), 0.5, 1 or 2.
    pub proficiency_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLabels {
    pub base_damage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    #[serde(skip_deserializing)]
    pub id: ItemId,
    #[serde(skip_deserializing)]
    pub actor: Option<ActorId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub weapon_type: Option<WeaponType>,
    pub base_item: String,
    pub damage: ItemDamage,
    pub magical_bonus: Option<u32>,
    pub properties: Vec<String>,
    /// Whether attunement is required.
    pub attunement: bool,
    pub attuned: bool,
    pub critical: ItemCritical,
    /// Explicit proficiency multiplier.
    pub proficient: Option<f64>,
    /// Abilities an attack with this item may use, replacing the defaults.
    pub ability_override: Vec<String>,
    pub quantity: u32,
    #[serde(skip_deserializing)]
    pub activities: Vec<ActivityId>,
    #[serde(skip_deserializing)]
    pub derived: ItemDerived,
    #[serde(skip_deserializing)]
    pub labels: ItemLabels,
}

impl Item {
    pub fn from_source(id: ItemId, actor: Option<ActorId>, raw: &Value) -> Result<Self, SchemaError> {
        let mut item: Item = item_schema().decode(raw)?;
        item.id = id;
        item.actor = actor;
        Ok(item)
    }

    pub fn from_source_lenient(
        id: ItemId,
        actor: Option<ActorId>,
        raw: &Value,
    ) -> Result<(Self, Vec<FieldFailure>), SchemaError> {
        let (mut item, failures): (Item, _) = item_schema().decode_lenient(raw)?;
        item.id = id;
        item.actor = actor;
        Ok((item, failures))
    }

    /// Attack type, classification, ability override and proficiency.
    /// Reads the owning actor's derived state when there is one.
    pub fn prepare_derived(&mut self, actor: Option<&Actor>, rules: &RulesTables) {
        let attack_type = self.default_attack_type();
        let classification = self.default_classification();
        let overrides = self.default_ability_override(rules);
        let multiplier = self.default_proficiency(actor);

        set_if_absent(&mut self.derived.attack_type, || attack_type);
        set_if_absent(&mut self.derived.classification, || classification);
        set_if_absent(&mut self.derived.ability_override, || overrides);
        set_if_absent(&mut self.derived.proficiency_multiplier, || Some(multiplier));
    }

    /// Base damage label. Needs no roll data.
    pub fn prepare_final(&mut self) {
        let label = self
            .base_damage()
            .map(DamagePart::formula)
            .filter(|f| !f.is_empty());
        self.labels.base_damage = label;
    }

    fn default_attack_type(&self) -> Option<AttackType> {
        match self.kind {
            ItemKind::Weapon => Some(
                self.weapon_type
                    .map(WeaponType::attack_type)
                    .unwrap_or(AttackType::Melee),
            ),
            _ => None,
        }
    }

    fn default_classification(&self) -> Option<AttackClassification> {
        match self.kind {
            ItemKind::Weapon => Some(AttackClassification::Weapon),
            ItemKind::Spell => Some(AttackClassification::Spell),
            _ => None,
        }
    }

    fn default_ability_override(&self, rules: &RulesTables) -> Vec<String> {
        if !self.ability_override.is_empty() {
            return self.ability_override.clone();
        }
        if self.kind == ItemKind::Weapon && self.has_property(PROPERTY_FINESSE) {
            return vec![
                rules.default_melee_ability.clone(),
                rules.default_ranged_ability.clone(),
            ];
        }
        Vec::new()
    }

    fn default_proficiency(&self, actor: Option<&Actor>) -> f64 {
        if let Some(explicit) = self.proficient {
            return explicit;
        }
        let Some(actor) = actor else {
            return 0.0;
        };
        let proficient = match self.kind {
            ItemKind::Weapon => {
                actor.is_npc()
                    || self.weapon_type == Some(WeaponType::Natural)
                    || self
                        .weapon_type
                        .and_then(WeaponType::category)
                        .is_some_and(|category| actor.is_proficient_with(category))
                    || actor.is_proficient_with(&self.base_item)
            }
            ItemKind::Spell => true,
            _ => actor.is_npc(),
        };
        if proficient {
            1.0
        } else {
            0.0
        }
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    pub fn is_weapon(&self) -> bool {
        self.kind == ItemKind::Weapon
    }

    pub fn is_versatile(&self) -> bool {
        self.has_property(PROPERTY_VERSATILE)
    }

    /// Magic is suppressed while required attunement is missing.
    pub fn magic_available(&self) -> bool {
        self.has_property(PROPERTY_MAGICAL) && (!self.attunement || self.attuned)
    }

    /// The magical bonus, when positive and available.
    pub fn available_magical_bonus(&self) -> Option<u32> {
        self.magical_bonus
            .filter(|bonus| *bonus > 0)
            .filter(|_| self.magic_available())
    }

    pub fn offers_base_damage(&self) -> bool {
        self.is_weapon() && self.damage.base.is_some()
    }

    pub fn base_damage(&self) -> Option<&DamagePart> {
        self.damage.base.as_ref()
    }

    pub fn versatile_damage(&self) -> Option<&DamagePart> {
        self.damage.versatile.as_ref()
    }

    pub fn proficiency_multiplier(&self) -> f64 {
        self.derived.proficiency_multiplier.unwrap_or(0.0)
    }

    pub fn roll_values(&self) -> RollValues {
        let mut values = RollValues::new();
        values.set("magicalBonus", f64::from(self.magical_bonus.unwrap_or(0)));
        values.set("quantity", f64::from(self.quantity));
        values.set("prof", self.proficiency_multiplier());
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn longsword() -> Item {
        Item::from_source(
            ItemId::new(),
            None,
            &json!({
                "name": "Longsword",
                "type": "weapon",
                "weaponType": "martialM",
                "baseItem": "longsword",
                "damage": {
                    "base": { "number": 1, "denomination": 8, "types": ["slashing"] },
                    "versatile": { "denomination": 10 }
                },
                "magicalBonus": 1,
                "properties": ["ver", "mgc"]
            }),
        )
        .unwrap()
    }

    fn actor(raw: serde_json::Value) -> Actor {
        let mut actor = Actor::from_source(ActorId::new(), &raw).unwrap();
        actor.prepare_derived(&RulesTables::default());
        actor
    }

    #[test]
    fn test_weapon_derived_fields() {
        let fighter = actor(json!({ "weaponProficiencies": ["mar"] }));
        let mut item = longsword();
        item.prepare_derived(Some(&fighter), &RulesTables::default());
        assert_eq!(item.derived.attack_type, Some(AttackType::Melee));
        assert_eq!(item.derived.classification, Some(AttackClassification::Weapon));
        assert_eq!(item.proficiency_multiplier(), 1.0);
        assert!(item.derived.ability_override.is_empty());
    }

    #[test]
    fn test_proficiency_sources() {
        let rules = RulesTables::default();
        let commoner = actor(json!({}));
        let mut item = longsword();
        item.prepare_derived(Some(&commoner), &rules);
        assert_eq!(item.proficiency_multiplier(), 0.0);

        let by_base_item = actor(json!({ "weaponProficiencies": ["longsword"] }));
        let mut item = longsword();
        item.prepare_derived(Some(&by_base_item), &rules);
        assert_eq!(item.proficiency_multiplier(), 1.0);

        let npc = actor(json!({ "type": "npc" }));
        let mut item = longsword();
        item.prepare_derived(Some(&npc), &rules);
        assert_eq!(item.proficiency_multiplier(), 1.0);

        let mut item = longsword();
        item.proficient = Some(2.0);
        item.prepare_derived(None, &rules);
        assert_eq!(item.proficiency_multiplier(), 2.0);
    }

    #[test]
    fn test_finesse_override() {
        let mut item = longsword();
        item.properties.push(PROPERTY_FINESSE.into());
        item.prepare_derived(None, &RulesTables::default());
        assert_eq!(item.derived.ability_override, vec!["str", "dex"]);

        let mut item = longsword();
        item.ability_override = vec!["int".into()];
        item.properties.push(PROPERTY_FINESSE.into());
        item.prepare_derived(None, &RulesTables::default());
        assert_eq!(item.derived.ability_override, vec!["int"]);
    }

    #[test]
    fn test_derived_phase_is_idempotent() {
        let rules = RulesTables::default();
        let fighter = actor(json!({ "weaponProficiencies": ["mar"] }));
        let mut once = longsword();
        once.prepare_derived(Some(&fighter), &rules);
        let mut twice = once.clone();
        twice.prepare_derived(Some(&fighter), &rules);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_magic_requires_attunement() {
        let mut item = longsword();
        assert_eq!(item.available_magical_bonus(), Some(1));
        item.attunement = true;
        assert_eq!(item.available_magical_bonus(), None);
        item.attuned = true;
        assert_eq!(item.available_magical_bonus(), Some(1));
        item.properties.retain(|p| p != PROPERTY_MAGICAL);
        assert_eq!(item.available_magical_bonus(), None);
    }

    #[test]
    fn test_ranged_weapon_and_spell() {
        let mut bow = longsword();
        bow.weapon_type = Some(WeaponType::MartialRanged);
        bow.prepare_derived(None, &RulesTables::default());
        assert_eq!(bow.derived.attack_type, Some(AttackType::Ranged));

        let mut spell = Item::from_source(ItemId::new(), None, &json!({ "type": "spell" })).unwrap();
        spell.prepare_derived(None, &RulesTables::default());
        assert_eq!(spell.derived.attack_type, None);
        assert_eq!(spell.derived.classification, Some(AttackClassification::Spell));
    }

    #[test]
    fn test_final_label() {
        let mut item = longsword();
        item.prepare_final();
        assert_eq!(item.labels.base_damage.as_deref(), Some("1d8"));
        assert!(item.is_versatile());
        assert!(item.offers_base_damage());
    }
}
