//! Roll formulas
//!
//! A [`Formula`] is a validated arithmetic/dice expression such as
//! `1d8 + @mod + 2`. This module only checks that a formula is well formed
//! and reshapes it; rolling dice is left to the host.

mod compose;
mod simplify;
mod terms;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use compose::{format_modifier, join_terms, replace_formula_data, to_hit_label};
pub use simplify::{FormulaSimplifier, SimplifyOptions, StandardSimplifier};
pub use terms::{fmt_number, split_leading_dice, DiceTerm, LeadingDice};

/// Error when parsing a roll formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("Unbalanced parentheses in formula '{0}'")]
    UnbalancedParentheses(String),
    #[error("Unexpected character '{ch}' in formula '{formula}'")]
    UnexpectedCharacter { formula: String, ch: char },
    /// Dice count must be a whole number and faces at least 1
    #[error("Invalid dice term in formula '{0}'")]
    InvalidDice(String),
    #[error("Formula '{0}' must not contain dice")]
    NotDeterministic(String),
    /// An operator with no operand after it (e.g. "2 +")
    #[error("Formula '{0}' has an operator without an operand")]
    DanglingOperator(String),
    /// Two operands next to each other (e.g. "2 3")
    #[error("Formula '{0}' is missing an operator")]
    MissingOperator(String),
    #[error("Unclosed flavor text in formula '{0}'")]
    UnclosedFlavor(String),
    #[error("Number out of range in formula '{0}'")]
    NumberOutOfRange(String),
}

/// A syntactically valid roll formula. The empty formula is valid and
/// means "no term".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Formula(String);

impl Formula {
    /// Parse and validate a formula. Surrounding whitespace is dropped.
    pub fn new(formula: impl Into<String>) -> Result<Self, FormulaError> {
        let formula = formula.into().trim().to_string();
        terms::validate(&formula)?;
        Ok(Self(formula))
    }

    /// Parse a formula that must not contain dice.
    pub fn deterministic(formula: impl Into<String>) -> Result<Self, FormulaError> {
        let formula = Self::new(formula)?;
        if !formula.is_deterministic() {
            return Err(FormulaError::NotDeterministic(formula.0));
        }
        Ok(formula)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the formula has no dice terms.
    pub fn is_deterministic(&self) -> bool {
        terms::tokenize(&self.0)
            .map(|tokens| tokens.iter().all(|t| !t.is_dice()))
            .unwrap_or(false)
    }

    /// True for a formula that is a plain number equal to zero (`0`, `+0`).
    pub fn is_zero(&self) -> bool {
        let text: String = self.0.chars().filter(|c| !c.is_whitespace()).collect();
        text.trim_start_matches('+')
            .trim_start_matches('-')
            .parse::<f64>()
            .map(|n| n == 0.0)
            .unwrap_or(false)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Formula {
    type Error = FormulaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Formula> for String {
    fn from(value: Formula) -> Self {
        value.0
    }
}

impl AsRef<str> for Formula {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
