//! Selector evaluation for the in-memory store.
//!
//! Supports the subset of the selector language the query compiler emits:
//! `$and`, `$or`, bare equality (with array membership), `$gt`, `$gte`,
//! `$lt`, `$lte`, `$ne`, `$eq` and `$regex` with `$options`. Selectors are
//! compiled up front, so an unsupported operator is rejected before any
//! document is looked at.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::path::value_at;
use crate::query::SortSpecifier;

/// A selector checked and compiled once, then evaluated against many
/// documents. Regex patterns are built at compile time.
pub(crate) struct Selector {
    clauses: Vec<Clause>,
}

enum Clause {
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Field { path: String, condition: Condition },
}

enum Condition {
    Equals(Value),
    Operators(Vec<Operator>),
}

enum Operator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Regex(Regex),
}

impl Selector {
    pub(crate) fn compile(selector: &Value) -> Result<Self, StoreError> {
        let clauses = selector
            .as_object()
            .ok_or_else(|| StoreError::InvalidSelector(format!("expected object, got {}", selector)))?;

        let mut compiled = Vec::with_capacity(clauses.len());
        for (key, condition) in clauses {
            let clause = match key.as_str() {
                "$and" => Clause::And(compile_list(key, condition)?),
                "$or" => Clause::Or(compile_list(key, condition)?),
                op if op.starts_with('$') => {
                    return Err(StoreError::InvalidSelector(format!(
                        "unsupported top-level operator {}",
                        op
                    )))
                }
                path => Clause::Field {
                    path: path.to_string(),
                    condition: Condition::compile(condition)?,
                },
            };
            compiled.push(clause);
        }
        Ok(Selector { clauses: compiled })
    }

    pub(crate) fn matches(&self, document: &Value) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::And(all) => all.iter().all(|sub| sub.matches(document)),
            Clause::Or(any) => any.iter().any(|sub| sub.matches(document)),
            Clause::Field { path, condition } => condition.matches(value_at(document, path)),
        })
    }
}

fn compile_list(key: &str, value: &Value) -> Result<Vec<Selector>, StoreError> {
    value
        .as_array()
        .ok_or_else(|| StoreError::InvalidSelector(format!("{} expects an array", key)))?
        .iter()
        .map(Selector::compile)
        .collect()
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.contains_key("$oid") && map.keys().any(|k| k.starts_with('$'))
}

impl Condition {
    fn compile(condition: &Value) -> Result<Self, StoreError> {
        let operators = match condition {
            Value::Object(map) if is_operator_object(map) => map,
            _ => return Ok(Condition::Equals(condition.clone())),
        };

        let mut compiled = Vec::with_capacity(operators.len());
        for (op, operand) in operators {
            let operator = match op.as_str() {
                "$eq" => Operator::Eq(operand.clone()),
                "$ne" => Operator::Ne(operand.clone()),
                "$gt" => Operator::Gt(operand.clone()),
                "$gte" => Operator::Gte(operand.clone()),
                "$lt" => Operator::Lt(operand.clone()),
                "$lte" => Operator::Lte(operand.clone()),
                "$regex" => {
                    let options = operators.get("$options").and_then(Value::as_str).unwrap_or("");
                    Operator::Regex(build_regex(operand, options)?)
                }
                "$options" => continue,
                other => {
                    return Err(StoreError::InvalidSelector(format!(
                        "unsupported operator {}",
                        other
                    )))
                }
            };
            compiled.push(operator);
        }
        Ok(Condition::Operators(compiled))
    }

    fn matches(&self, target: Option<&Value>) -> bool {
        match self {
            Condition::Equals(expected) => equals_or_contains(target, expected),
            Condition::Operators(operators) => operators.iter().all(|operator| match operator {
                Operator::Eq(operand) => equals_or_contains(target, operand),
                Operator::Ne(operand) => !equals_or_contains(target, operand),
                Operator::Gt(operand) => compare(target, operand) == Some(Ordering::Greater),
                Operator::Gte(operand) => matches!(
                    compare(target, operand),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                Operator::Lt(operand) => compare(target, operand) == Some(Ordering::Less),
                Operator::Lte(operand) => matches!(
                    compare(target, operand),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                Operator::Regex(regex) => {
                    matches!(target, Some(Value::String(s)) if regex.is_match(s))
                }
            }),
        }
    }
}

fn build_regex(pattern: &Value, options: &str) -> Result<Regex, StoreError> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| StoreError::InvalidSelector("$regex expects a string".into()))?;
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .build()
        .map_err(|e| StoreError::InvalidSelector(e.to_string()))
}

fn equals_or_contains(target: Option<&Value>, expected: &Value) -> bool {
    match target {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two values of the same kind; `None` across kinds.
fn compare(target: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (target?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used to sort documents: missing and null first, then by
/// type, then by value.
fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    type_rank(a)
        .cmp(&type_rank(b))
        .then_with(|| match b {
            Some(b) => compare(a, b).unwrap_or(Ordering::Equal),
            None => Ordering::Equal,
        })
}

pub(crate) fn compare_documents(a: &Value, b: &Value, sort: &SortSpecifier) -> Ordering {
    for (property, direction) in sort.iter() {
        let ordering = sort_order(value_at(a, property), value_at(b, property));
        let ordering = if direction < 0 { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
