//! In-process criterion evaluation over JSON values.
//!
//! Backends without a query engine serialize each entity to JSON and apply
//! the same criteria the SQL translator would render. Missing paths match
//! nothing; operators outside the allow-list are still rejected.

use std::cmp::Ordering;

use serde_json::Value;

use crate::criterion::{Criterion, OperandRight, ScalarValue};
use crate::error::QueryError;
use crate::operator::OperatorSet;

/// Evaluate one criterion against an entity's JSON representation.
pub fn matches(
    criterion: &Criterion,
    entity: &Value,
    operators: &OperatorSet,
) -> Result<bool, QueryError> {
    operators.validate(criterion)?;
    let actual = match lookup(entity, &criterion.operand_left) {
        Some(value) => value,
        None => return Ok(false),
    };
    let operator = criterion.operator.to_ascii_lowercase();
    let result = match (&criterion.operand_right, operator.as_str()) {
        (OperandRight::List(values), "in") => values.iter().any(|v| scalar_eq(actual, v)),
        (OperandRight::Scalar(expected), "=") => scalar_eq(actual, expected),
        (OperandRight::Scalar(expected), "!=") => !scalar_eq(actual, expected),
        (OperandRight::Scalar(expected), "<") => {
            compare(actual, expected) == Some(Ordering::Less)
        }
        (OperandRight::Scalar(expected), "<=") => {
            matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal))
        }
        (OperandRight::Scalar(expected), ">") => {
            compare(actual, expected) == Some(Ordering::Greater)
        }
        (OperandRight::Scalar(expected), ">=") => matches!(
            compare(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        (OperandRight::Scalar(expected), "like") => match (actual.as_str(), expected) {
            (Some(text), ScalarValue::Text(pattern)) => like_match(text, pattern),
            _ => false,
        },
        _ => false,
    };
    Ok(result)
}

/// Resolve a property path within a JSON value.
///
/// Understands dotted segments, `["..."]` indexers for keys with illegal
/// characters, and numeric segments as array indices.
pub fn lookup<'a>(entity: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = entity;
    for segment in path_segments(path) {
        current = match current {
            Value::Object(map) => map.get(segment.as_str())?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Split a path into segments, treating `["key"]` indexers as one segment.
fn path_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        if let Some(open) = rest.find("[\"") {
            if open > 0 {
                let head = rest[..open].trim_end_matches('.');
                segments.extend(head.split('.').filter(|s| !s.is_empty()).map(String::from));
            }
            let after = &rest[open + 2..];
            match after.find("\"]") {
                Some(close) => {
                    segments.push(after[..close].to_string());
                    rest = after[close + 2..].trim_start_matches('.');
                }
                None => {
                    // Unterminated indexer, take the remainder verbatim.
                    segments.push(after.to_string());
                    rest = "";
                }
            }
        } else {
            segments.extend(rest.split('.').filter(|s| !s.is_empty()).map(String::from));
            rest = "";
        }
    }
    segments
}

fn scalar_eq(actual: &Value, expected: &ScalarValue) -> bool {
    match (actual, expected) {
        (Value::Bool(a), ScalarValue::Bool(b)) => a == b,
        (Value::Number(a), ScalarValue::Int(b)) => {
            a.as_i64() == Some(*b) || a.as_f64() == Some(*b as f64)
        }
        (Value::Number(a), ScalarValue::Float(b)) => a.as_f64() == Some(*b),
        (Value::String(a), ScalarValue::Text(b)) => a == b,
        _ => false,
    }
}

/// Order actual against expected: numerically for numbers, lexically for
/// strings, incomparable otherwise.
fn compare(actual: &Value, expected: &ScalarValue) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), ScalarValue::Int(b)) => {
            a.as_f64().and_then(|a| a.partial_cmp(&(*b as f64)))
        }
        (Value::Number(a), ScalarValue::Float(b)) => a.as_f64().and_then(|a| a.partial_cmp(b)),
        (Value::String(a), ScalarValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

/// SQL LIKE with `%` wildcards only. No `%` means exact equality.
fn like_match(text: &str, pattern: &str) -> bool {
    if !pattern.contains('%') {
        return text == pattern;
    }
    let parts: Vec<&str> = pattern.split('%').collect();
    let anchored_start = !pattern.starts_with('%');
    let anchored_end = !pattern.ends_with('%');

    let mut rest = text;
    let mut start = 0;
    let mut end = parts.len();

    if anchored_start {
        let first = parts[0];
        if !rest.starts_with(first) {
            return false;
        }
        rest = &rest[first.len()..];
        start = 1;
    }
    if anchored_end && end > start {
        let last = parts[end - 1];
        if !rest.ends_with(last) {
            return false;
        }
        rest = &rest[..rest.len() - last.len()];
        end -= 1;
    }

    let middle = if start < end { &parts[start..end] } else { &[][..] };
    for part in middle {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}
