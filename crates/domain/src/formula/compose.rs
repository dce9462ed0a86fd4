//! Assembling term lists into formulas and rendering roll labels.

use super::terms::fmt_number;
use crate::roll_data::RollLookup;

/// Join non-blank terms with ` + `, in order.
pub fn join_terms<S: AsRef<str>>(terms: &[S]) -> String {
    terms
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Substitute every `@path` reference with its roll-data value.
/// Unknown references become `0`.
pub fn replace_formula_data(formula: &str, data: &dyn RollLookup) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut chars = formula.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch != '@' {
            out.push(ch);
            continue;
        }
        let mut end = start + 1;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                end = i + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let path = formula[start + 1..end].trim_end_matches('.');
        if path.is_empty() {
            out.push('@');
            continue;
        }
        let value = data.lookup(path).unwrap_or(0.0);
        out.push_str(&fmt_number(value));
    }
    out
}

/// Deterministic label: `""` becomes `"0"`, plain numbers get a sign.
pub fn format_modifier(simplified: &str) -> String {
    let simplified = simplified.trim();
    if simplified.is_empty() {
        return "0".into();
    }
    match simplified.parse::<f64>() {
        Ok(n) if n > 0.0 => format!("+{}", fmt_number(n)),
        Ok(n) => fmt_number(n),
        Err(_) => simplified.to_string(),
    }
}

/// To-hit label: prefixed with `+ ` unless it already starts with a sign.
pub fn to_hit_label(simplified: &str) -> String {
    let simplified = simplified.trim();
    let label = if simplified.is_empty() { "0" } else { simplified };
    if label.starts_with('+') || label.starts_with('-') {
        label.to_string()
    } else {
        format!("+ {label}")
    }
}
