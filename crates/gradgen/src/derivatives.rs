use crate::ir::{DerivativeBlock, GradInputMask, GRAD_ALIAS, GRAD_INPUT_MASK};
use crate::schema::DerivativeEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivativePlan {
    /// Bind `grad` to the first incoming gradient before any block runs.
    pub uses_grad_alias: bool,
    pub blocks: Vec<DerivativeBlock>,
}

/// Lowers derivative entries to guarded blocks, in schema order.
pub fn emit_derivatives(derivatives: &[DerivativeEntry]) -> DerivativePlan {
    let uses_grad_alias = derivatives
        .iter()
        .any(|derivative| mentions_identifier(&derivative.formula, GRAD_ALIAS));
    let blocks = derivatives.iter().map(emit_block).collect();
    DerivativePlan {
        uses_grad_alias,
        blocks,
    }
}

fn emit_block(derivative: &DerivativeEntry) -> DerivativeBlock {
    let formula = derivative.formula.clone();
    match derivative.var_names.as_slice() {
        [var] => DerivativeBlock::Single {
            var: var.clone(),
            formula,
        },
        vars => {
            let mask = mentions_identifier(&formula, GRAD_INPUT_MASK).then(|| GradInputMask {
                vars: vars.to_vec(),
            });
            DerivativeBlock::Multi {
                vars: vars.to_vec(),
                formula,
                mask,
            }
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Whole-word identifier search: `grad` matches in `grad.mul(2)` but not in
/// `gradient` or `grads[0]`.
pub fn mentions_identifier(text: &str, ident: &str) -> bool {
    identifiers(text).any(|word| word == ident)
}

/// Maximal runs of identifier characters in `text`.
pub fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    text.split(|ch: char| !is_ident_char(ch))
        .filter(|word| !word.is_empty())
}

const TUPLE_CONSTRUCTORS: &[&str] = &["std::make_tuple", "std::forward_as_tuple", "std::tie"];

/// Component count of a formula that is a literal tuple construction.
///
/// Returns `None` when the arity cannot be read off the text.
pub fn tuple_arity(formula: &str) -> Option<usize> {
    let formula = formula.trim();
    let inner = if let Some(rest) = formula.strip_prefix('{') {
        rest.strip_suffix('}')?
    } else {
        let rest = TUPLE_CONSTRUCTORS
            .iter()
            .find_map(|ctor| formula.strip_prefix(ctor))?
            .trim_start();
        rest.strip_prefix('(')?.strip_suffix(')')?
    };
    if inner.contains('<') {
        return None;
    }
    count_top_level_items(inner)
}

fn count_top_level_items(inner: &str) -> Option<usize> {
    if inner.trim().is_empty() {
        return Some(0);
    }
    let mut depth = 0i32;
    let mut items = 1;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev: Option<char> = None;
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            prev = Some(ch);
            continue;
        }
        match ch {
            // Digit separator, e.g. `1'000`.
            '\'' if prev.is_some_and(|p| p.is_ascii_alphanumeric()) => {}
            '"' | '\'' => quote = Some(ch),
            // Commented-out text can hide or invent separators.
            '/' if matches!(chars.peek(), Some('/' | '*')) => return None,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                // The outer delimiters closed early, e.g. `{a}, {b}`.
                if depth < 0 {
                    return None;
                }
            }
            ',' if depth == 0 => items += 1,
            _ => {}
        }
        prev = Some(ch);
    }
    (depth == 0 && quote.is_none()).then_some(items)
}
