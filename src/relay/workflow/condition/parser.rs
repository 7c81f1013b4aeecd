// SPDX-License-Identifier: MIT

//! Routing predicate parser
//!
//! Parses expressions like:
//! - `decision is unset`
//! - `transcript < 3`
//! - `a is unset or (b is unset and transcript < 2)`
//!
//! `or` binds looser than `and`; parentheses group.

use super::ast::Predicate;
use crate::adk::error::WorkflowError;

const UNSET_SUFFIX: &str = " is unset";
const TRANSCRIPT_PREFIX: &str = "transcript";

/// Parse a predicate string into an AST
pub fn parse(input: &str) -> Result<Predicate, WorkflowError> {
    parse_expr(input.trim(), input)
}

fn parse_expr(expr: &str, whole: &str) -> Result<Predicate, WorkflowError> {
    if expr.is_empty() {
        return Err(WorkflowError::invalid_predicate(whole, "empty expression"));
    }

    if let Some(pos) = find_top_level(expr, " or ", whole)? {
        let left = parse_expr(expr[..pos].trim(), whole)?;
        let right = parse_expr(expr[pos + 4..].trim(), whole)?;
        return Ok(left.or(right));
    }

    if let Some(pos) = find_top_level(expr, " and ", whole)? {
        let left = parse_expr(expr[..pos].trim(), whole)?;
        let right = parse_expr(expr[pos + 5..].trim(), whole)?;
        return Ok(left.and(right));
    }

    if let Some(inner) = strip_outer_parens(expr) {
        return parse_expr(inner.trim(), whole);
    }

    parse_atom(expr, whole)
}

/// Byte offset of the first occurrence of `op` outside parentheses
fn find_top_level(expr: &str, op: &str, whole: &str) -> Result<Option<usize>, WorkflowError> {
    let bytes = expr.as_bytes();
    let mut depth: i32 = 0;

    for i in 0..bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(WorkflowError::invalid_predicate(
                        whole,
                        "unbalanced parentheses",
                    ));
                }
            }
            _ if depth == 0 && bytes[i..].starts_with(op.as_bytes()) => return Ok(Some(i)),
            _ => {}
        }
    }

    if depth != 0 {
        return Err(WorkflowError::invalid_predicate(
            whole,
            "unbalanced parentheses",
        ));
    }
    Ok(None)
}

/// Inner text when the whole expression is wrapped in one matching pair
fn strip_outer_parens(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0;
    for b in inner.bytes() {
        match b {
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

fn parse_atom(expr: &str, whole: &str) -> Result<Predicate, WorkflowError> {
    if expr == "always" {
        return Ok(Predicate::Always);
    }

    if let Some(field) = expr.strip_suffix(UNSET_SUFFIX) {
        let field = field.trim();
        if !is_field_path(field) {
            return Err(WorkflowError::invalid_predicate(
                whole,
                format!("'{}' is not a valid field name", field),
            ));
        }
        return Ok(Predicate::unset(field));
    }

    if let Some(rest) = expr.strip_prefix(TRANSCRIPT_PREFIX) {
        if let Some(n) = rest.trim_start().strip_prefix('<') {
            let n = n.trim();
            return n
                .parse::<usize>()
                .map(Predicate::transcript_below)
                .map_err(|_| {
                    WorkflowError::invalid_predicate(
                        whole,
                        format!("'{}' is not a non-negative integer", n),
                    )
                });
        }
    }

    Err(WorkflowError::invalid_predicate(
        whole,
        format!("could not parse '{}'", expr),
    ))
}

/// Dot-separated identifiers: `market_data` or `watchlist_result.ofac_match`
fn is_field_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
