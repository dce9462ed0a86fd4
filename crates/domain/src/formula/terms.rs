//! Tokenizing and term splitting for roll formulas.
//!
//! Parsed by hand, like the dice parser it grew out of, to keep the domain
//! crate free of a parser dependency.

use super::FormulaError;

/// A dice term such as `2d6` or `1d20kh1`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiceTerm {
    pub number: u32,
    pub faces: u32,
    /// Roll modifiers written after the faces (`kh1`, `r<2`, ...).
    pub modifiers: String,
}

impl DiceTerm {
    pub fn render(&self) -> String {
        format!("{}d{}{}", self.number, self.faces, self.modifiers)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Dice(DiceTerm),
    Variable(String),
    Function(String),
    Operator(char),
    Open,
    Close,
    Comma,
}

impl Token {
    pub(crate) fn is_dice(&self) -> bool {
        matches!(self, Token::Dice(_))
    }
}

/// Render a number without a trailing `.0` for whole values.
pub fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub(crate) fn tokenize(formula: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = formula.chars().collect();
    let unexpected = |ch: char| FormulaError::UnexpectedCharacter {
        formula: formula.to_string(),
        ch,
    };
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if starts_dice(&chars, i) {
                    let number = text
                        .parse::<u32>()
                        .map_err(|_| FormulaError::InvalidDice(formula.to_string()))?;
                    let (dice, next) = read_dice(formula, &chars, i, number)?;
                    tokens.push(Token::Dice(dice));
                    i = next;
                } else {
                    let value = text.parse::<f64>().map_err(|_| unexpected('.'))?;
                    if !value.is_finite() {
                        return Err(FormulaError::NumberOutOfRange(formula.to_string()));
                    }
                    tokens.push(Token::Number(value));
                }
            }
            'd' if starts_dice(&chars, i) => {
                let (dice, next) = read_dice(formula, &chars, i, 1)?;
                tokens.push(Token::Dice(dice));
                i = next;
            }
            '@' => {
                let start = i + 1;
                i = start;
                while i < chars.len() && is_path_char(chars[i]) {
                    i += 1;
                }
                if i == start {
                    return Err(unexpected('@'));
                }
                tokens.push(Token::Variable(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let mut lookahead = i;
                while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                    lookahead += 1;
                }
                if chars.get(lookahead) != Some(&'(') {
                    return Err(unexpected(c));
                }
                tokens.push(Token::Function(chars[start..i].iter().collect()));
                i = lookahead;
            }
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Operator(ch));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '[' => {
                // Flavor text carries no value.
                match chars[i..].iter().position(|c| *c == ']') {
                    Some(offset) => i += offset + 1,
                    None => return Err(FormulaError::UnclosedFlavor(formula.to_string())),
                }
            }
            other => return Err(unexpected(other)),
        }
    }

    Ok(tokens)
}

fn starts_dice(chars: &[char], i: usize) -> bool {
    chars.get(i) == Some(&'d') && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

fn is_path_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
}

/// Reads `dFACES[modifiers]` starting at the `d`.
fn read_dice(
    formula: &str,
    chars: &[char],
    d_pos: usize,
    number: u32,
) -> Result<(DiceTerm, usize), FormulaError> {
    let mut i = d_pos + 1;
    let start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let faces = chars[start..i]
        .iter()
        .collect::<String>()
        .parse::<u32>()
        .map_err(|_| FormulaError::InvalidDice(formula.to_string()))?;
    if faces == 0 {
        return Err(FormulaError::InvalidDice(formula.to_string()));
    }
    let mod_start = i;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '<' | '>' | '=')) {
        i += 1;
    }
    let modifiers = chars[mod_start..i].iter().collect();
    Ok((
        DiceTerm {
            number,
            faces,
            modifiers,
        },
        i,
    ))
}

/// Checks operand/operator alternation and parenthesis balance.
pub(crate) fn validate(formula: &str) -> Result<Vec<Token>, FormulaError> {
    let tokens = tokenize(formula)?;
    // One entry per open parenthesis: true when it opens a function call.
    let mut frames: Vec<bool> = Vec::new();
    let mut expect_operand = true;
    let mut after_function = false;

    for token in &tokens {
        match token {
            Token::Number(_) | Token::Dice(_) | Token::Variable(_) | Token::Function(_) => {
                if !expect_operand {
                    return Err(FormulaError::MissingOperator(formula.to_string()));
                }
                expect_operand = matches!(token, Token::Function(_));
                after_function = expect_operand;
                continue;
            }
            Token::Open => {
                if !expect_operand {
                    return Err(FormulaError::MissingOperator(formula.to_string()));
                }
                frames.push(after_function);
            }
            Token::Close => {
                if expect_operand {
                    return Err(FormulaError::DanglingOperator(formula.to_string()));
                }
                if frames.pop().is_none() {
                    return Err(FormulaError::UnbalancedParentheses(formula.to_string()));
                }
            }
            Token::Comma => {
                if frames.last() != Some(&true) {
                    return Err(FormulaError::UnexpectedCharacter {
                        formula: formula.to_string(),
                        ch: ',',
                    });
                }
                if expect_operand {
                    return Err(FormulaError::DanglingOperator(formula.to_string()));
                }
                expect_operand = true;
            }
            Token::Operator(op) => {
                if expect_operand && !matches!(op, '+' | '-') {
                    return Err(FormulaError::DanglingOperator(formula.to_string()));
                }
                expect_operand = true;
            }
        }
        after_function = false;
    }

    if !frames.is_empty() {
        return Err(FormulaError::UnbalancedParentheses(formula.to_string()));
    }
    if expect_operand && !tokens.is_empty() {
        return Err(FormulaError::DanglingOperator(formula.to_string()));
    }
    Ok(tokens)
}

/// Render tokens back to text, normalizing spacing.
pub(crate) fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut expect_operand = true;
    for token in tokens {
        match token {
            Token::Number(n) => {
                out.push_str(&fmt_number(*n));
                expect_operand = false;
            }
            Token::Dice(d) => {
                out.push_str(&d.render());
                expect_operand = false;
            }
            Token::Variable(path) => {
                out.push('@');
                out.push_str(path);
                expect_operand = false;
            }
            Token::Function(name) => {
                out.push_str(name);
                expect_operand = true;
            }
            Token::Open => {
                out.push('(');
                expect_operand = true;
            }
            Token::Close => {
                out.push(')');
                expect_operand = false;
            }
            Token::Comma => {
                out.push_str(", ");
                expect_operand = true;
            }
            Token::Operator(op) if expect_operand => out.push(*op),
            Token::Operator(op) => {
                out.push(' ');
                out.push(*op);
                out.push(' ');
                expect_operand = true;
            }
        }
    }
    out
}

/// What one additive term holds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TermKind {
    Number(f64),
    Dice(DiceTerm),
    /// Variables and function calls, kept verbatim.
    Other { text: String, has_dice: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Term {
    pub negative: bool,
    pub kind: TermKind,
}

/// Split an additive formula (no `*`, `/`, `%`) into signed terms,
/// distributing signs over parenthesized groups.
pub(crate) fn additive_terms(tokens: &[Token]) -> Vec<Term> {
    let mut out = Vec::new();
    collect_terms(tokens, false, &mut out);
    out
}

fn collect_terms(tokens: &[Token], negated: bool, out: &mut Vec<Term>) {
    let mut negative = negated;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Operator('-') => negative = !negative,
            Token::Operator(_) | Token::Comma | Token::Close => {}
            Token::Number(n) => {
                out.push(Term {
                    negative,
                    kind: TermKind::Number(*n),
                });
                negative = negated;
            }
            Token::Dice(d) => {
                out.push(Term {
                    negative,
                    kind: TermKind::Dice(d.clone()),
                });
                negative = negated;
            }
            Token::Variable(path) => {
                out.push(Term {
                    negative,
                    kind: TermKind::Other {
                        text: format!("@{path}"),
                        has_dice: false,
                    },
                });
                negative = negated;
            }
            Token::Function(_) => {
                let end = matching_close(tokens, i + 1);
                let call = &tokens[i..=end.min(tokens.len() - 1)];
                out.push(Term {
                    negative,
                    kind: TermKind::Other {
                        text: render(call),
                        has_dice: call.iter().any(Token::is_dice),
                    },
                });
                negative = negated;
                i = end;
            }
            Token::Open => {
                let end = matching_close(tokens, i);
                collect_terms(&tokens[i + 1..end.min(tokens.len())], negative, out);
                negative = negated;
                i = end;
            }
        }
        i += 1;
    }
}

/// Join signed term texts: `-a + b - c`.
pub(crate) fn join_signed(parts: &[(bool, String)]) -> String {
    let mut out = String::new();
    for (index, (negative, text)) in parts.iter().enumerate() {
        match (index, negative) {
            (0, false) => {}
            (0, true) => out.push('-'),
            (_, false) => out.push_str(" + "),
            (_, true) => out.push_str(" - "),
        }
        out.push_str(text);
    }
    out
}

/// A formula that starts with plain, positive dice (`2d6 + @mod + 1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadingDice {
    pub number: u32,
    pub faces: u32,
    /// The remaining terms with any positive `@mod` removed.
    pub remainder: String,
    /// The remaining terms as written.
    pub full_remainder: String,
    pub had_mod: bool,
}

/// Split off a leading `NdM` term. Returns `None` for anything that is not
/// an additive formula starting with unmodified positive dice.
pub fn split_leading_dice(formula: &str) -> Option<LeadingDice> {
    let tokens = validate(formula).ok()?;
    if tokens
        .iter()
        .any(|t| matches!(t, Token::Operator('*' | '/' | '%')))
    {
        return None;
    }
    let mut terms = additive_terms(&tokens).into_iter();
    let (number, faces) = match terms.next()? {
        Term {
            negative: false,
            kind: TermKind::Dice(dice),
        } if dice.modifiers.is_empty() => (dice.number, dice.faces),
        _ => return None,
    };

    let mut had_mod = false;
    let mut rest = Vec::new();
    let mut all = Vec::new();
    for term in terms {
        let text = match term.kind {
            TermKind::Other { text, .. } => text,
            TermKind::Number(n) => fmt_number(n),
            TermKind::Dice(d) => d.render(),
        };
        all.push((term.negative, text.clone()));
        if text == "@mod" && !term.negative && !had_mod {
            had_mod = true;
            continue;
        }
        rest.push((term.negative, text));
    }
    Some(LeadingDice {
        number,
        faces,
        remainder: join_signed(&rest),
        full_remainder: join_signed(&all),
        had_mod,
    })
}

/// Index of the `)` matching the `(` at `open`, or the slice length when
/// unbalanced.
fn matching_close(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open + offset;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}
