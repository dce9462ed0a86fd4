//! Unified error types for the domain layer
//!
//! `SchemaError` and `MigrationError` are the two failures a record can
//! produce on its way into the rules core. `DomainError` wraps them (and
//! formula failures) for callers that handle every domain failure the same
//! way.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formula::FormulaError;

/// One field that failed validation, addressed by its dotted path
/// (e.g. `damage.parts[1].number`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFailure {
    pub path: String,
    pub message: String,
}

impl FieldFailure {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn join_failures(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A raw value could not be coerced to its declared type or broke a hard
/// constraint. Every failing field is listed; siblings are still validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Schema validation failed: {}", join_failures(.failures))]
pub struct SchemaError {
    failures: Vec<FieldFailure>,
}

impl SchemaError {
    pub fn new(failures: Vec<FieldFailure>) -> Self {
        Self { failures }
    }

    /// Create an error for a single field.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldFailure::new(path, message)])
    }

    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// Path of the first failing field, if any.
    pub fn first_path(&self) -> Option<&str> {
        self.failures.first().map(|f| f.path.as_str())
    }

    /// Whether a failure was recorded for exactly this path.
    pub fn has_path(&self, path: &str) -> bool {
        self.failures.iter().any(|f| f.path == path)
    }
}

/// A legacy record cannot be reshaped into the current schema.
///
/// Migration is all-or-nothing: when this is returned, nothing was produced
/// and the legacy record is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A legacy field has a shape the transform cannot interpret.
    #[error("Legacy field `{field}` cannot be migrated: {reason}")]
    InvalidField { field: String, reason: String },

    /// The legacy `actionType` has no counterpart activity kind.
    #[error("Unsupported legacy action type `{0}`")]
    UnsupportedActionType(String),

    /// The reshaped record does not validate against the current schema.
    #[error("Migrated {record} failed validation at `{field}`: {source}")]
    Invalid {
        record: &'static str,
        field: String,
        source: SchemaError,
    },
}

impl MigrationError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a schema failure of the migrated `record` ("item" or "activity").
    pub fn invalid(record: &'static str, source: SchemaError) -> Self {
        let field = source.first_path().unwrap_or_default().to_string();
        Self::Invalid {
            record,
            field,
            source,
        }
    }

    /// The offending field, when one can be named.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidField { field, .. } | Self::Invalid { field, .. } => Some(field),
            Self::UnsupportedActionType(_) => Some("actionType"),
        }
    }
}

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Formula(#[from] FormulaError),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Schema(_) => "schema",
            Self::Migration(_) => "migration",
            Self::Formula(_) => "formula",
        }
    }
}
