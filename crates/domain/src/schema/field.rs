//! Field descriptors and the generic cleaner that interprets them.

use serde_json::{Map, Number, Value};

use super::SchemaDefinition;
use crate::error::FieldFailure;
use crate::formula::{fmt_number, Formula};

#[derive(Debug, Clone)]
pub enum FieldKind {
    String {
        choices: Option<&'static [&'static str]>,
        /// Whether `""` is a value of its own; otherwise it means "unset".
        blank: bool,
    },
    Number {
        integer: bool,
        positive: bool,
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    Formula {
        deterministic: bool,
    },
    Object(SchemaDefinition),
    List(Box<Field>),
    /// A list without duplicates, first occurrence kept.
    Set(Box<Field>),
    /// String keys to values of one field type.
    Map(Box<Field>),
}

/// A typed field with its default and constraints.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    nullable: bool,
    initial: Option<Value>,
}

impl Field {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: false,
            initial: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String {
            choices: None,
            blank: true,
        })
    }

    /// A string restricted to `choices`. Defaults to the first choice.
    pub fn choice(choices: &'static [&'static str]) -> Self {
        Self::of(FieldKind::String {
            choices: Some(choices),
            blank: false,
        })
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number {
            integer: false,
            positive: false,
            min: None,
            max: None,
        })
    }

    /// A whole number. Bounded to the `i32` range so it always fits the
    /// typed record; narrow further with [`Field::min`].
    pub fn integer() -> Self {
        Self::of(FieldKind::Number {
            integer: true,
            positive: false,
            min: Some(f64::from(i32::MIN)),
            max: Some(f64::from(i32::MAX)),
        })
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn formula() -> Self {
        Self::of(FieldKind::Formula {
            deterministic: false,
        })
    }

    pub fn deterministic_formula() -> Self {
        Self::of(FieldKind::Formula {
            deterministic: true,
        })
    }

    pub fn object(schema: SchemaDefinition) -> Self {
        Self::of(FieldKind::Object(schema))
    }

    pub fn list(element: Field) -> Self {
        Self::of(FieldKind::List(Box::new(element)))
    }

    pub fn set(element: Field) -> Self {
        Self::of(FieldKind::Set(Box::new(element)))
    }

    pub fn map(value: Field) -> Self {
        Self::of(FieldKind::Map(Box::new(value)))
    }

    /// `null` becomes a value of its own and the default.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Treat `""` as unset.
    pub fn not_blank(mut self) -> Self {
        if let FieldKind::String { blank, .. } = &mut self.kind {
            *blank = false;
        }
        self
    }

    pub fn positive(mut self) -> Self {
        if let FieldKind::Number { positive, .. } = &mut self.kind {
            *positive = true;
        }
        self
    }

    pub fn min(mut self, value: f64) -> Self {
        if let FieldKind::Number { min, .. } = &mut self.kind {
            *min = Some(value);
        }
        self
    }

    pub fn max(mut self, value: f64) -> Self {
        if let FieldKind::Number { max, .. } = &mut self.kind {
            *max = Some(value);
        }
        self
    }

    pub fn with_initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Default used when the raw value is absent.
    pub fn initial(&self) -> Value {
        if let Some(initial) = &self.initial {
            return initial.clone();
        }
        if self.nullable {
            return Value::Null;
        }
        match &self.kind {
            FieldKind::String {
                choices: Some(choices),
                ..
            } => choices
                .first()
                .map(|c| Value::String((*c).to_string()))
                .unwrap_or_default(),
            FieldKind::String { .. } | FieldKind::Formula { .. } => Value::String(String::new()),
            FieldKind::Number { .. } => Value::from(0),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Object(schema) => schema.initial(),
            FieldKind::List(_) | FieldKind::Set(_) => Value::Array(Vec::new()),
            FieldKind::Map(_) => Value::Object(Map::new()),
        }
    }

    /// Coerce `raw` into this field's shape. Failures are pushed onto
    /// `failures` and the field falls back to its initial value.
    pub fn clean(&self, raw: Option<&Value>, path: &str, failures: &mut Vec<FieldFailure>) -> Value {
        match raw {
            None => self.initial(),
            Some(Value::Null) if self.nullable => Value::Null,
            Some(Value::Null) => self.initial(),
            Some(value) => match self.coerce(value, path, failures) {
                Ok(value) => value,
                Err(message) => {
                    failures.push(FieldFailure::new(path, message));
                    self.initial()
                }
            },
        }
    }

    fn coerce(
        &self,
        value: &Value,
        path: &str,
        failures: &mut Vec<FieldFailure>,
    ) -> Result<Value, String> {
        match &self.kind {
            FieldKind::String { choices, blank } => {
                let text = scalar_text(value).ok_or("must be a string")?;
                if text.is_empty() && !blank {
                    return Ok(self.initial());
                }
                if let Some(choices) = choices {
                    if !choices.contains(&text.as_str()) {
                        return Err(format!("must be one of: {}", choices.join(", ")));
                    }
                }
                Ok(Value::String(text))
            }
            FieldKind::Number {
                integer,
                positive,
                min,
                max,
            } => {
                let n = match value {
                    Value::Number(n) => n.as_f64().ok_or("must be a number")?,
                    Value::String(s) if s.trim().is_empty() => return Ok(self.initial()),
                    Value::String(s) => s.trim().parse::<f64>().map_err(|_| "must be a number")?,
                    _ => return Err("must be a number".into()),
                };
                if !n.is_finite() {
                    return Err("must be a finite number".into());
                }
                if *integer && n.fract() != 0.0 {
                    return Err("must be an integer".into());
                }
                if *positive && n <= 0.0 {
                    return Err("must be positive".into());
                }
                if let Some(min) = min.filter(|min| n < *min) {
                    return Err(format!("must be at least {}", fmt_number(min)));
                }
                if let Some(max) = max.filter(|max| n > *max) {
                    return Err(format!("must be at most {}", fmt_number(max)));
                }
                number_value(n).ok_or_else(|| "must be a finite number".into())
            }
            FieldKind::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|n| n != 0.0))),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "" => Ok(self.initial()),
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err("must be a boolean".into()),
                },
                _ => Err("must be a boolean".into()),
            },
            FieldKind::Formula { deterministic } => {
                let text = scalar_text(value).ok_or("must be a formula string")?;
                let formula = if *deterministic {
                    Formula::deterministic(text)
                } else {
                    Formula::new(text)
                }
                .map_err(|e| e.to_string())?;
                Ok(Value::String(formula.into()))
            }
            FieldKind::Object(schema) => {
                let map = value.as_object().ok_or("must be an object")?;
                Ok(schema.clean_map(map, path, failures))
            }
            FieldKind::List(element) => {
                let items = value.as_array().ok_or("must be a list")?;
                Ok(Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| element.clean(Some(item), &format!("{path}[{i}]"), failures))
                        .collect(),
                ))
            }
            FieldKind::Set(element) => {
                let items = value.as_array().ok_or("must be a list")?;
                let mut out: Vec<Value> = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let cleaned = element.clean(Some(item), &format!("{path}[{i}]"), failures);
                    if !out.contains(&cleaned) {
                        out.push(cleaned);
                    }
                }
                Ok(Value::Array(out))
            }
            FieldKind::Map(entry) => {
                let map = value.as_object().ok_or("must be a mapping")?;
                Ok(Value::Object(
                    map.iter()
                        .map(|(key, item)| {
                            let cleaned = entry.clean(Some(item), &child_path(path, key), failures);
                            (key.clone(), cleaned)
                        })
                        .collect(),
                ))
            }
        }
    }
}

pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => n.as_f64().map(fmt_number),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whole numbers are stored as integers so records serialize stably.
fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Some(Value::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number)
    }
}
