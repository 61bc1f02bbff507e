//! Adhoc filter construction shared by the merge steps.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::MalformedInput;

pub const EXPRESSION_SIMPLE: &str = "SIMPLE";
pub const EXPRESSION_SQL: &str = "SQL";

/// Query clause an adhoc filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Where,
    Having,
}

impl Clause {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Where => "WHERE",
            Self::Having => "HAVING",
        }
    }
}

/// Convert a legacy `{col, op, val}` filter into a SIMPLE adhoc filter.
///
/// `field` names the form data key the filter came from and only feeds error
/// messages.
pub fn simple_filter_to_adhoc(
    field: &str,
    filter: &Value,
    clause: Clause,
) -> Result<Value, MalformedInput> {
    let filter = filter
        .as_object()
        .ok_or_else(|| MalformedInput::filter(field, "filter must be an object"))?;
    let subject = filter
        .get("col")
        .filter(|col| !col.is_null())
        .ok_or_else(|| MalformedInput::filter(field, "filter is missing 'col'"))?;
    let operator = filter
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| MalformedInput::filter(field, "filter is missing a string 'op'"))?;

    let mut result = Map::new();
    result.insert("clause".into(), clause.as_str().into());
    result.insert("expressionType".into(), EXPRESSION_SIMPLE.into());
    result.insert(
        "comparator".into(),
        filter.get("val").cloned().unwrap_or(Value::Null),
    );
    result.insert("operator".into(), operator.into());
    result.insert("subject".into(), subject.clone());
    if filter.get("isExtra").is_some_and(super::types::is_truthy) {
        result.insert("isExtra".into(), Value::Bool(true));
    }
    Ok(with_option_name(result))
}

/// Convert a free-form SQL `where`/`having` clause into an SQL adhoc filter.
pub fn sql_clause_to_adhoc(clause: Clause, expression: &str) -> Value {
    let mut result = Map::new();
    result.insert("clause".into(), clause.as_str().into());
    result.insert("expressionType".into(), EXPRESSION_SQL.into());
    result.insert("sqlExpression".into(), expression.into());
    with_option_name(result)
}

fn with_option_name(mut filter: Map<String, Value>) -> Value {
    let name = filter_option_name(&filter);
    filter.insert("filterOptionName".into(), Value::String(name));
    Value::Object(filter)
}

/// Deterministic name derived from the filter's canonical JSON.
pub fn filter_option_name(filter: &Map<String, Value>) -> String {
    let canonical = canonical_json(&Value::Object(filter.clone()));
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|key| (key.clone(), sort_keys(&map[key])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
