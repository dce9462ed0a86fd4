//! Record shapes built from [`Field`] descriptors.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::field::{child_path, Field};
use crate::error::{FieldFailure, SchemaError};

/// An ordered set of named fields. Serialization follows declaration order.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    name: &'static str,
    fields: Vec<(&'static str, Field)>,
}

/// Result of a lenient clean: the best-effort value plus what failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned {
    pub value: Value,
    pub failures: Vec<FieldFailure>,
}

impl Cleaned {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> Result<Value, SchemaError> {
        if self.failures.is_empty() {
            Ok(self.value)
        } else {
            Err(SchemaError::new(self.failures))
        }
    }
}

impl SchemaDefinition {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Append a field. A repeated key replaces the earlier declaration in
    /// place, so kind schemas can refine a shared base.
    pub fn with(mut self, key: &'static str, field: Field) -> Self {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((key, field)),
        }
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, f)| f)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(k, _)| *k)
    }

    /// Every field at its default.
    pub fn initial(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(key, field)| ((*key).to_string(), field.initial()))
                .collect(),
        )
    }

    /// Lenient clean: failed fields fall back to their defaults.
    pub fn clean(&self, raw: &Value) -> Cleaned {
        let mut failures = Vec::new();
        let value = match raw.as_object() {
            Some(map) => self.clean_map(map, "", &mut failures),
            None => {
                failures.push(FieldFailure::new("", "must be an object"));
                self.initial()
            }
        };
        Cleaned { value, failures }
    }

    /// Strict validation: any failing field fails the record.
    pub fn validate(&self, raw: &Value) -> Result<Value, SchemaError> {
        self.clean(raw).into_result()
    }

    /// Validate, then deserialize into the typed record.
    pub fn decode<T: DeserializeOwned>(&self, raw: &Value) -> Result<T, SchemaError> {
        let value = self.validate(raw)?;
        self.deserialize(value)
    }

    /// Clean, then deserialize; the failures are returned alongside.
    pub fn decode_lenient<T: DeserializeOwned>(
        &self,
        raw: &Value,
    ) -> Result<(T, Vec<FieldFailure>), SchemaError> {
        let cleaned = self.clean(raw);
        let record = self.deserialize(cleaned.value)?;
        Ok((record, cleaned.failures))
    }

    fn deserialize<T: DeserializeOwned>(&self, value: Value) -> Result<T, SchemaError> {
        serde_json::from_value(value).map_err(|e| {
            SchemaError::single("", format!("{} record does not decode: {e}", self.name))
        })
    }

    /// Unknown keys are dropped; declared keys are emitted in order.
    pub(crate) fn clean_map(
        &self,
        map: &Map<String, Value>,
        path: &str,
        failures: &mut Vec<FieldFailure>,
    ) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(key, field)| {
                    let cleaned = field.clean(map.get(*key), &child_path(path, key), failures);
                    ((*key).to_string(), cleaned)
                })
                .collect(),
        )
    }
}
