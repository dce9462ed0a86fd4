//! One term of a damage expression.

use serde::{Deserialize, Serialize};

use crate::common::{none_if_blank, set_if_absent};
use crate::formula::{join_terms, split_leading_dice, Formula, FormulaError};

/// A free-form formula used instead of number/denomination/bonus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomDamage {
    pub enabled: bool,
    pub formula: Formula,
}

/// Dice count, die size, flat bonus and damage types. Parts are always
/// cloned when moved between records; nothing shares one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DamagePart {
    pub number: Option<u32>,
    pub denomination: Option<u32>,
    pub bonus: Formula,
    /// Ordered, de-duplicated damage type ids.
    pub types: Vec<String>,
    pub custom: CustomDamage,
    /// The item's innate damage.
    pub base: bool,
}

impl DamagePart {
    pub fn dice(number: u32, denomination: u32) -> Self {
        Self {
            number: Some(number),
            denomination: Some(denomination),
            ..Self::default()
        }
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for ty in types {
            let ty = ty.into();
            if !self.types.contains(&ty) {
                self.types.push(ty);
            }
        }
        self
    }

    pub fn with_bonus(mut self, bonus: Formula) -> Self {
        self.bonus = bonus;
        self
    }

    pub fn custom(formula: Formula) -> Self {
        Self {
            custom: CustomDamage {
                enabled: true,
                formula,
            },
            ..Self::default()
        }
    }

    /// `NdM`, if both parts are set and non-zero.
    pub fn dice_term(&self) -> Option<String> {
        match (self.number, self.denomination) {
            (Some(n), Some(d)) if n > 0 && d > 0 => Some(format!("{n}d{d}")),
            _ => None,
        }
    }

    /// The roll formula for this part, before any roll data is applied.
    pub fn formula(&self) -> String {
        if self.custom.enabled {
            return self.custom.formula.to_string();
        }
        let dice = self.dice_term().unwrap_or_default();
        join_terms(&[dice.as_str(), self.bonus.as_str()])
    }

    /// `d8` for a denomination of 8.
    pub fn denomination_label(&self) -> Option<String> {
        self.denomination.filter(|d| *d > 0).map(|d| format!("d{d}"))
    }

    /// Fill unset dice and types from `other`. Set values are kept.
    pub fn fill_from(&mut self, other: &DamagePart) {
        set_if_absent(&mut self.number, || other.number);
        set_if_absent(&mut self.denomination, || other.denomination);
        set_if_absent(&mut self.types, || other.types.clone());
    }

    /// Build a part from a legacy `[formula, type]` pair. A formula that
    /// starts with plain dice is split into number/denomination/bonus.
    /// With `strip_mod`, a `+ @mod` term is dropped; only weapon base and
    /// versatile damage re-add it. Everything else is kept as a custom
    /// formula.
    pub fn from_legacy(
        formula: &str,
        damage_type: Option<&str>,
        strip_mod: bool,
    ) -> Result<Self, FormulaError> {
        let formula = Formula::new(formula)?;
        let types = damage_type.and_then(none_if_blank).map(String::from);

        let part = match split_leading_dice(formula.as_str()) {
            Some(split) => {
                let bonus = if strip_mod { split.remainder } else { split.full_remainder };
                Self::dice(split.number, split.faces).with_bonus(Formula::new(bonus)?)
            }
            None if formula.is_empty() => Self::default(),
            None => Self::custom(formula),
        };
        Ok(part.with_types(types))
    }
}
