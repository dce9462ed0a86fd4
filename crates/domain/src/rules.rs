//! d20 rules tables and the small enums the attack logic is keyed on.
//!
//! Tables are passed explicitly to every computation that needs them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub const DEFAULT_CRITICAL_THRESHOLD: u32 = 20;

/// Lookup tables for one ruleset configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesTables {
    pub default_melee_ability: String,
    pub default_ranged_ability: String,
    pub critical_threshold: u32,
    /// Known ability ids, in display order.
    pub abilities: Vec<String>,
}

impl Default for RulesTables {
    fn default() -> Self {
        Self {
            default_melee_ability: "str".into(),
            default_ranged_ability: "dex".into(),
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            abilities: ["str", "dex", "con", "int", "wis", "cha"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RulesTables {
    pub fn default_ability(&self, attack_type: AttackType) -> &str {
        match attack_type {
            AttackType::Melee => &self.default_melee_ability,
            AttackType::Ranged => &self.default_ranged_ability,
        }
    }

    /// floor((score - 10) / 2)
    pub fn ability_modifier(&self, score: i32) -> i32 {
        // Rust's / rounds toward zero
        let diff = score - 10;
        if diff >= 0 {
            diff / 2
        } else {
            (diff - 1) / 2
        }
    }

    pub fn proficiency_bonus(&self, level: u32) -> i32 {
        ((level.max(1) as i32 - 1) / 4) + 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackType {
    Melee,
    Ranged,
}

impl AttackType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Ranged => "ranged",
        }
    }
}

impl FromStr for AttackType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "melee" => Ok(Self::Melee),
            "ranged" => Ok(Self::Ranged),
            other => Err(DomainError::validation(format!(
                "unknown attack type `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackClassification {
    Weapon,
    Spell,
    Unarmed,
}

impl AttackClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Spell => "spell",
            Self::Unarmed => "unarmed",
        }
    }
}

impl FromStr for AttackClassification {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weapon" => Ok(Self::Weapon),
            "spell" => Ok(Self::Spell),
            "unarmed" => Ok(Self::Unarmed),
            other => Err(DomainError::validation(format!(
                "unknown attack classification `{other}`"
            ))),
        }
    }
}

/// `mwak`, `rwak`, `msak`, `rsak`: melee/ranged × weapon/spell attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTypeCode {
    Mwak,
    Rwak,
    Msak,
    Rsak,
}

impl ActionTypeCode {
    /// Ranged → `r`, else `m`; spell → `sak`, else `wak`.
    pub fn from_parts(
        attack_type: Option<AttackType>,
        classification: Option<AttackClassification>,
    ) -> Self {
        let ranged = attack_type == Some(AttackType::Ranged);
        let spell = classification == Some(AttackClassification::Spell);
        match (ranged, spell) {
            (false, false) => Self::Mwak,
            (true, false) => Self::Rwak,
            (false, true) => Self::Msak,
            (true, true) => Self::Rsak,
        }
    }

    /// Inverse of [`from_parts`](Self::from_parts). Weapon attacks map back
    /// to the `weapon` classification.
    pub fn parts(self) -> (AttackType, AttackClassification) {
        match self {
            Self::Mwak => (AttackType::Melee, AttackClassification::Weapon),
            Self::Rwak => (AttackType::Ranged, AttackClassification::Weapon),
            Self::Msak => (AttackType::Melee, AttackClassification::Spell),
            Self::Rsak => (AttackType::Ranged, AttackClassification::Spell),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mwak => "mwak",
            Self::Rwak => "rwak",
            Self::Msak => "msak",
            Self::Rsak => "rsak",
        }
    }
}

impl fmt::Display for ActionTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionTypeCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mwak" => Ok(Self::Mwak),
            "rwak" => Ok(Self::Rwak),
            "msak" => Ok(Self::Msak),
            "rsak" => Ok(Self::Rsak),
            other => Err(DomainError::validation(format!(
                "unknown action type `{other}`"
            ))),
        }
    }
}

/// How the attacker wields the item for one roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttackMode {
    #[default]
    OneHanded,
    TwoHanded,
    OffHand,
    Thrown,
    ThrownOffHand,
}

impl AttackMode {
    pub fn is_thrown(self) -> bool {
        matches!(self, Self::Thrown | Self::ThrownOffHand)
    }

    pub fn is_off_hand(self) -> bool {
        matches!(self, Self::OffHand | Self::ThrownOffHand)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneHanded => "oneHanded",
            Self::TwoHanded => "twoHanded",
            Self::OffHand => "offHand",
            Self::Thrown => "thrown",
            Self::ThrownOffHand => "thrownOffHand",
        }
    }
}

impl FromStr for AttackMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oneHanded" => Ok(Self::OneHanded),
            "twoHanded" => Ok(Self::TwoHanded),
            "offHand" => Ok(Self::OffHand),
            "thrown" => Ok(Self::Thrown),
            "thrownOffHand" => Ok(Self::ThrownOffHand),
            other => Err(DomainError::validation(format!(
                "unknown attack mode `{other}`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ability_modifier_calculation() {
        let rules = RulesTables::default();
        assert_eq!(rules.ability_modifier(1), -5);
        assert_eq!(rules.ability_modifier(8), -1);
        assert_eq!(rules.ability_modifier(9), -1);
        assert_eq!(rules.ability_modifier(10), 0);
        assert_eq!(rules.ability_modifier(11), 0);
        assert_eq!(rules.ability_modifier(16), 3);
        assert_eq!(rules.ability_modifier(20), 5);
    }

    #[test]
    fn proficiency_bonus_progression() {
        let rules = RulesTables::default();
        assert_eq!(rules.proficiency_bonus(0), 2);
        assert_eq!(rules.proficiency_bonus(1), 2);
        assert_eq!(rules.proficiency_bonus(5), 3);
        assert_eq!(rules.proficiency_bonus(9), 4);
        assert_eq!(rules.proficiency_bonus(17), 6);
    }

    #[test]
    fn action_type_code_table() {
        use AttackClassification::*;
        use AttackType::*;
        assert_eq!(ActionTypeCode::from_parts(Some(Melee), Some(Weapon)), ActionTypeCode::Mwak);
        assert_eq!(ActionTypeCode::from_parts(Some(Ranged), Some(Weapon)), ActionTypeCode::Rwak);
        assert_eq!(ActionTypeCode::from_parts(Some(Melee), Some(Spell)), ActionTypeCode::Msak);
        assert_eq!(ActionTypeCode::from_parts(Some(Ranged), Some(Spell)), ActionTypeCode::Rsak);
        assert_eq!(ActionTypeCode::from_parts(None, Some(Unarmed)), ActionTypeCode::Mwak);
    }

    #[test]
    fn action_type_code_inverse() {
        for code in ["mwak", "rwak", "msak", "rsak"] {
            let parsed: ActionTypeCode = code.parse().unwrap();
            let (value, classification) = parsed.parts();
            assert_eq!(
                ActionTypeCode::from_parts(Some(value), Some(classification)).as_str(),
                code
            );
        }
        assert!("util".parse::<ActionTypeCode>().is_err());
    }

    #[test]
    fn rules_tables_deserialize_with_defaults() {
        let rules: RulesTables =
            serde_json::from_value(serde_json::json!({ "criticalThreshold": 19 })).unwrap();
        assert_eq!(rules.critical_threshold, 19);
        assert_eq!(rules.default_melee_ability, "str");
        assert_eq!(rules.default_ability(AttackType::Ranged), "dex");
    }

    #[test]
    fn attack_mode_flags() {
        assert!(AttackMode::ThrownOffHand.is_thrown());
        assert!(AttackMode::ThrownOffHand.is_off_hand());
        assert!(!AttackMode::TwoHanded.is_off_hand());
        assert_eq!("twoHanded".parse::<AttackMode>().unwrap(), AttackMode::TwoHanded);
    }
}
