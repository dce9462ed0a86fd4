//! The flat legacy item layout and its transform.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::MigratedRecord;
use crate::common::StringExt;
use crate::entities::DamagePart;
use crate::error::MigrationError;
use crate::rules::ActionTypeCode;
use crate::schema::{activity_schema_for, item_schema};

/// A legacy item. Leaves are kept as raw values; the transform interprets
/// them and the current schemas coerce them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyItemRecord {
    pub name: Value,
    #[serde(rename = "type")]
    pub kind: Value,
    pub weapon_type: Value,
    pub base_item: Value,
    pub magical_bonus: Value,
    pub properties: Value,
    pub attunement: Value,
    pub attuned: Value,
    pub proficient: Value,
    pub quantity: Value,
    pub action_type: Value,
    pub ability: Value,
    pub attack_bonus: Value,
    pub attack: Option<LegacyAttack>,
    pub critical: Option<LegacyCritical>,
    pub damage: Option<LegacyDamage>,
    /// The "other formula" of utility items.
    pub formula: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyAttack {
    pub bonus: Value,
    pub flat: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyCritical {
    pub threshold: Value,
    pub damage: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyDamage {
    /// `[formula, damageType]` pairs.
    pub parts: Vec<Value>,
    pub versatile: Value,
}

enum Plan {
    Attack(ActionTypeCode),
    Damage,
    Utility,
    None,
}

impl LegacyItemRecord {
    pub fn from_value(raw: &Value) -> Result<Self, MigrationError> {
        if !raw.is_object() {
            return Err(MigrationError::invalid_field("", "must be an object"));
        }
        serde_json::from_value(raw.clone())
            .map_err(|e| MigrationError::invalid_field("", e.to_string()))
    }

    /// Reshape into an item record and, when the legacy item was usable,
    /// one activity record.
    pub fn migrate(&self) -> Result<MigratedRecord, MigrationError> {
        let is_weapon = text(&self.kind).as_deref() == Some("weapon");
        let mut parts = self.damage_parts(is_weapon)?;
        let plan = match text(&self.action_type).as_deref() {
            None if parts.is_empty() => Plan::None,
            None => Plan::Damage,
            Some(code @ ("mwak" | "rwak" | "msak" | "rsak")) => {
                let code = code
                    .parse::<ActionTypeCode>()
                    .map_err(|e| MigrationError::invalid_field("actionType", e.to_string()))?;
                Plan::Attack(code)
            }
            Some("util" | "other") => Plan::Utility,
            Some(other) => return Err(MigrationError::UnsupportedActionType(other.to_string())),
        };

        let base = if is_weapon && !parts.is_empty() {
            Some(parts.remove(0))
        } else {
            None
        };
        let plan = match plan {
            Plan::Utility if !parts.is_empty() => Plan::Damage,
            Plan::Damage if parts.is_empty() => Plan::None,
            plan => plan,
        };

        let mut item = self.item_fields()?;
        item.insert(
            "damage".into(),
            json!({
                "base": to_value(base.as_ref(), "damage.parts[0]")?,
                "versatile": to_value(self.versatile()?.as_ref(), "damage.versatile")?,
            }),
        );
        let critical = self.critical.clone().unwrap_or_default();
        let activity = match plan {
            Plan::Attack(code) => Some(self.attack_activity(code, &parts, &critical)?),
            Plan::Damage => Some(json!({
                "type": "damage",
                "damage": {
                    "critical": { "bonus": critical.damage },
                    "parts": parts_value(&parts)?,
                },
            })),
            Plan::Utility => Some(json!({
                "type": "utility",
                "roll": { "formula": self.formula },
            })),
            Plan::None => {
                // No activity to carry them; the item keeps its critical fields.
                item.insert(
                    "critical".into(),
                    json!({ "threshold": critical.threshold, "damage": critical.damage }),
                );
                None
            }
        };

        let item = item_schema()
            .validate(&Value::Object(item))
            .map_err(|e| MigrationError::invalid("item", e))?;
        let activity = activity
            .map(|activity| {
                let kind = activity["type"].as_str().unwrap_or_default();
                let schema = activity_schema_for(kind).ok_or_else(|| {
                    MigrationError::invalid_field("actionType", format!("no schema for `{kind}`"))
                })?;
                schema
                    .validate(&activity)
                    .map_err(|e| MigrationError::invalid("activity", e))
            })
            .transpose()?;
        Ok(MigratedRecord { item, activity })
    }

    fn item_fields(&self) -> Result<Map<String, Value>, MigrationError> {
        let mut item = Map::new();
        let copied = [
            ("name", &self.name),
            ("type", &self.kind),
            ("weaponType", &self.weapon_type),
            ("baseItem", &self.base_item),
            ("magicalBonus", &self.magical_bonus),
            ("proficient", &self.proficient),
            ("quantity", &self.quantity),
        ];
        for (key, value) in copied {
            if !value.is_null() {
                item.insert(key.into(), value.clone());
            }
        }
        if let Some(properties) = properties(&self.properties)? {
            item.insert("properties".into(), properties);
        }
        let (attunement, attuned) = attunement(&self.attunement)?;
        item.insert("attunement".into(), Value::Bool(attunement));
        let attuned = if self.attuned.is_null() {
            Value::Bool(attuned)
        } else {
            self.attuned.clone()
        };
        item.insert("attuned".into(), attuned);
        Ok(item)
    }

    fn attack_activity(
        &self,
        code: ActionTypeCode,
        parts: &[DamagePart],
        critical: &LegacyCritical,
    ) -> Result<Value, MigrationError> {
        let attack = self.attack.clone().unwrap_or_default();
        let bonus = if text(&attack.bonus).is_some() {
            attack.bonus
        } else {
            self.attack_bonus.clone()
        };
        let (value, classification) = code.parts();
        Ok(json!({
            "type": "attack",
            "attack": {
                "ability": text(&self.ability),
                "bonus": bonus,
                "critical": { "threshold": critical.threshold },
                "flat": attack.flat,
                "type": {
                    "value": value.as_str(),
                    "classification": classification.as_str(),
                },
            },
            "damage": {
                "critical": { "bonus": critical.damage },
                "includeBase": true,
                "parts": parts_value(parts)?,
            },
        }))
    }

    /// Legacy parts in order. For weapons the first one becomes base damage,
    /// which re-adds `@mod` when rolled, so only that one drops it.
    fn damage_parts(&self, is_weapon: bool) -> Result<Vec<DamagePart>, MigrationError> {
        let Some(damage) = &self.damage else {
            return Ok(Vec::new());
        };
        damage
            .parts
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let path = format!("damage.parts[{i}]");
                let (formula, damage_type) = match raw {
                    Value::Array(pair) if pair.len() <= 2 => (
                        pair.first().and_then(text).unwrap_or_default(),
                        pair.get(1).and_then(text),
                    ),
                    Value::String(formula) => (formula.clone(), None),
                    _ => {
                        return Err(MigrationError::invalid_field(
                            path,
                            "must be a [formula, type] pair",
                        ))
                    }
                };
                DamagePart::from_legacy(&formula, damage_type.as_deref(), is_weapon && i == 0)
                    .map_err(|e| MigrationError::invalid_field(path, e.to_string()))
            })
            .collect()
    }

    fn versatile(&self) -> Result<Option<DamagePart>, MigrationError> {
        let Some(formula) = self.damage.as_ref().and_then(|d| text(&d.versatile)) else {
            return Ok(None);
        };
        DamagePart::from_legacy(&formula, None, true)
            .map(Some)
            .map_err(|e| MigrationError::invalid_field("damage.versatile", e.to_string()))
    }
}

/// Reshape a legacy item record. The input is never modified; on error
/// nothing is produced.
pub fn transform_legacy(raw: &Value) -> Result<MigratedRecord, MigrationError> {
    LegacyItemRecord::from_value(raw)?.migrate()
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => s.clone().into_option(),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_value(part: Option<&DamagePart>, path: &str) -> Result<Value, MigrationError> {
    serde_json::to_value(part).map_err(|e| MigrationError::invalid_field(path, e.to_string()))
}

fn parts_value(parts: &[DamagePart]) -> Result<Value, MigrationError> {
    serde_json::to_value(parts).map_err(|e| MigrationError::invalid_field("damage.parts", e.to_string()))
}

/// Legacy properties were a `{ id: bool }` map.
fn properties(value: &Value) -> Result<Option<Value>, MigrationError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(_) => Ok(Some(value.clone())),
        Value::Object(map) => Ok(Some(Value::Array(
            map.iter()
                .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
                .map(|(id, _)| Value::String(id.clone()))
                .collect(),
        ))),
        _ => Err(MigrationError::invalid_field("properties", "must be a map or a list")),
    }
}

/// Legacy attunement: 0 none, 1 required, 2 attuned; or a requirement
/// string. Returns `(requires attunement, attuned)`.
fn attunement(value: &Value) -> Result<(bool, bool), MigrationError> {
    let level = match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => n.as_i64().unwrap_or(-1),
        Value::String(s) => match s.trim() {
            "" => 0,
            "required" | "optional" => 1,
            other => other.parse().unwrap_or(-1),
        },
        _ => -1,
    };
    match level {
        0 => Ok((false, false)),
        1 => Ok((true, false)),
        2 => Ok((true, true)),
        _ => Err(MigrationError::invalid_field(
            "attunement",
            "must be 0, 1, 2, \"required\" or \"optional\"",
        )),
    }
}
