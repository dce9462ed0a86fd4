//! Formula simplification.
//!
//! The pipeline only assembles term lists; turning them into display
//! strings goes through a [`FormulaSimplifier`], which hosts may replace
//! with their own dice engine.

use super::terms::{self, fmt_number, join_signed, DiceTerm, TermKind, Token};
use super::FormulaError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyOptions {
    /// Drop every non-deterministic (dice) term.
    pub deterministic: bool,
}

impl SimplifyOptions {
    pub fn deterministic() -> Self {
        Self {
            deterministic: true,
        }
    }
}

/// Simplifies a formula string for display or evaluation.
pub trait FormulaSimplifier: Send + Sync {
    fn simplify(&self, formula: &str, options: SimplifyOptions) -> Result<String, FormulaError>;
}

/// Additive simplifier: groups like dice, keeps other terms in order and
/// sums plain numbers into one trailing constant.
///
/// Formulas containing `*`, `/` or `%` are not rearranged; they are returned
/// normalized, or as `""` in deterministic mode when they contain dice.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSimplifier;

impl FormulaSimplifier for StandardSimplifier {
    fn simplify(&self, formula: &str, options: SimplifyOptions) -> Result<String, FormulaError> {
        let tokens = terms::validate(formula)?;
        if tokens.is_empty() {
            return Ok(String::new());
        }

        let multiplicative = tokens
            .iter()
            .any(|t| matches!(t, Token::Operator('*' | '/' | '%')));
        if multiplicative {
            if options.deterministic && tokens.iter().any(Token::is_dice) {
                return Ok(String::new());
            }
            return Ok(terms::render(&tokens));
        }

        let mut dice: Vec<(bool, DiceTerm)> = Vec::new();
        let mut others: Vec<(bool, String)> = Vec::new();
        let mut constant = 0.0;
        let mut saw_number = false;

        for term in terms::additive_terms(&tokens) {
            match term.kind {
                TermKind::Number(n) => {
                    saw_number = true;
                    constant += if term.negative { -n } else { n };
                }
                TermKind::Dice(_) if options.deterministic => {}
                TermKind::Dice(d) => merge_dice(&mut dice, term.negative, d),
                TermKind::Other { has_dice: true, .. } if options.deterministic => {}
                TermKind::Other { text, .. } => others.push((term.negative, text)),
            }
        }

        let mut parts: Vec<(bool, String)> = dice
            .into_iter()
            .map(|(negative, d)| (negative, d.render()))
            .chain(others)
            .collect();
        if !constant.is_finite() {
            return Err(FormulaError::NumberOutOfRange(formula.to_string()));
        }
        if constant != 0.0 {
            parts.push((constant < 0.0, fmt_number(constant.abs())));
        }

        if parts.is_empty() {
            return Ok(if saw_number { "0".into() } else { String::new() });
        }
        Ok(join_signed(&parts))
    }
}

/// Plain dice of the same faces and sign collapse into one term, unless
/// the combined count would not fit.
fn merge_dice(dice: &mut Vec<(bool, DiceTerm)>, negative: bool, term: DiceTerm) {
    if term.modifiers.is_empty() {
        let merged = dice.iter_mut().find_map(|(neg, d)| {
            let mergeable = *neg == negative && d.faces == term.faces && d.modifiers.is_empty();
            let number = d.number.checked_add(term.number).filter(|_| mergeable)?;
            Some((d, number))
        });
        if let Some((existing, number)) = merged {
            existing.number = number;
            return;
        }
    }
    dice.push((negative, term));
}
