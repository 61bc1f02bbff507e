//! Merging of externally injected filters (dashboard native filters and
//! cross-filters) into a chart's own adhoc filters.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::core::adhoc::{Clause, EXPRESSION_SIMPLE, simple_filter_to_adhoc};
use crate::core::types::{FormData, is_truthy};
use crate::error::MalformedInput;

/// Time range value meaning "no time restriction".
pub const NO_TIME_RANGE: &str = "No filter";

/// Pseudo-columns in `extra_filters` that target time options instead of a column.
const TIME_EXTRA_COLUMNS: [(&str, &str); 4] = [
    ("__time_range", "time_range"),
    ("__time_col", "granularity_sqla"),
    ("__time_grain", "time_grain_sqla"),
    ("__granularity", "granularity"),
];

/// `extra_form_data` keys copied onto form data properties.
const OVERRIDE_REGULAR_MAPPINGS: [(&str, &str); 6] = [
    ("granularity", "granularity"),
    ("granularity_sqla", "granularity"),
    ("time_column", "time_column"),
    ("time_grain", "time_grain"),
    ("time_range", "time_range"),
    ("time_grain_sqla", "time_grain_sqla"),
];

/// `extra_form_data` keys copied into `form_data.extras`.
const OVERRIDE_EXTRA_KEYS: [&str; 3] = ["relative_start", "relative_end", "time_grain_sqla"];

/// Merge `extra_form_data` and `extra_filters` into `adhoc_filters`.
///
/// `applied_time_extras` is rebuilt from scratch on every call. Filters are
/// only ever appended. A column filter from `extra_filters` is
/// skipped when an existing SIMPLE adhoc filter on the same column and
/// operator already carries an equal comparator (lists compare as sets).
pub fn merge_extra_filters(mut form_data: FormData) -> Result<FormData, MalformedInput> {
    form_data.insert("applied_time_extras".into(), Value::Object(Map::new()));
    ensure_list(&mut form_data, "adhoc_filters")?;
    let mut form_data = merge_extra_form_data(form_data)?;

    let extra_filters = match form_data.shift_remove("extra_filters") {
        None | Some(Value::Null) => return Ok(form_data),
        Some(Value::Array(filters)) => filters,
        Some(_) => return Err(MalformedInput::filter("extra_filters", "expected a list")),
    };

    let existing = existing_filter_values(list_mut(&mut form_data, "adhoc_filters")?)?;
    let mut appended = Vec::new();

    for filter in extra_filters {
        let Value::Object(mut filter) = filter else {
            return Err(MalformedInput::filter("extra_filters", "filter must be an object"));
        };
        filter.insert("isExtra".into(), Value::Bool(true));
        let column = filter
            .get("col")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedInput::filter("extra_filters", "filter is missing 'col'"))?
            .to_string();
        let value = filter.get("val").cloned().unwrap_or(Value::Null);

        if let Some((_, target)) = TIME_EXTRA_COLUMNS.iter().find(|(col, _)| *col == column) {
            if is_truthy(&value) && value.as_str() != Some(NO_TIME_RANGE) {
                form_data.insert((*target).to_string(), value.clone());
                applied_time_extras(&mut form_data)?.insert(column, value);
            }
            continue;
        }
        if !is_truthy(&value) {
            continue;
        }

        let operator = filter
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedInput::filter("extra_filters", "filter is missing 'op'"))?;
        let key = filter_key(&Value::String(column.clone()), operator);
        let duplicate = existing
            .get(&key)
            .is_some_and(|current| same_comparator(current, &value));
        if !duplicate {
            appended.push(simple_filter_to_adhoc(
                "extra_filters",
                &Value::Object(filter),
                Clause::Where,
            )?);
        }
    }

    list_mut(&mut form_data, "adhoc_filters")?.extend(appended);
    Ok(form_data)
}

/// Apply `extra_form_data` overrides, extras, and appended filters.
fn merge_extra_form_data(mut form_data: FormData) -> Result<FormData, MalformedInput> {
    let extra_form_data = match form_data.shift_remove("extra_form_data") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(MalformedInput::field_type("extra_form_data", "an object")),
    };

    for (source, target) in OVERRIDE_REGULAR_MAPPINGS {
        if let Some(value) = extra_form_data.get(source).filter(|value| !value.is_null()) {
            form_data.insert(target.to_string(), value.clone());
        }
    }

    let mut extras = match form_data.get("extras") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(MalformedInput::field_type("extras", "an object")),
    };
    for key in OVERRIDE_EXTRA_KEYS {
        if let Some(value) = extra_form_data.get(key).filter(|value| !value.is_null()) {
            extras.insert(key.to_string(), value.clone());
        }
    }
    if !extras.is_empty() {
        form_data.insert("extras".into(), Value::Object(extras));
    }

    if let Some(adhoc_filters) = extra_form_data
        .get("adhoc_filters")
        .filter(|value| is_truthy(value))
    {
        let adhoc_filters = adhoc_filters.as_array().ok_or_else(|| {
            MalformedInput::filter("extra_form_data.adhoc_filters", "expected a list")
        })?;
        let mut appended = Vec::with_capacity(adhoc_filters.len());
        for filter in adhoc_filters {
            let mut tagged = filter.as_object().cloned().ok_or_else(|| {
                MalformedInput::filter("extra_form_data.adhoc_filters", "filter must be an object")
            })?;
            tagged.insert("isExtra".into(), Value::Bool(true));
            appended.push(Value::Object(tagged));
        }
        list_mut(&mut form_data, "adhoc_filters")?.extend(appended);
    }

    if let Some(filters) = extra_form_data.get("filters").filter(|value| is_truthy(value)) {
        let filters = filters.as_array().ok_or_else(|| {
            MalformedInput::filter("extra_form_data.filters", "expected a list")
        })?;
        let mut appended = Vec::new();
        for filter in filters.iter().filter(|filter| is_truthy(filter)) {
            let mut tagged = filter
                .as_object()
                .cloned()
                .ok_or_else(|| {
                    MalformedInput::filter("extra_form_data.filters", "filter must be an object")
                })?;
            tagged.insert("isExtra".into(), Value::Bool(true));
            appended.push(simple_filter_to_adhoc(
                "extra_form_data.filters",
                &Value::Object(tagged),
                Clause::Where,
            )?);
        }
        let targets: Vec<String> = form_data
            .keys()
            .filter(|key| key.starts_with("adhoc_filter"))
            .cloned()
            .collect();
        for target in targets {
            list_mut(&mut form_data, &target)?.extend(appended.iter().cloned());
        }
    }

    let time_range = form_data.get("time_range").filter(|value| is_truthy(value)).cloned();
    let has_granularity = form_data.get("granularity_sqla").is_some_and(is_truthy);
    if let Some(time_range) = time_range.filter(|_| !has_granularity) {
        for filter in list_mut(&mut form_data, "adhoc_filters")? {
            if let Some(filter) = filter.as_object_mut() {
                if filter.get("operator").and_then(Value::as_str) == Some("TEMPORAL_RANGE") {
                    filter.insert("comparator".into(), time_range.clone());
                }
            }
        }
    }

    Ok(form_data)
}

/// Comparators of existing SIMPLE adhoc filters keyed by `subject__operator`.
fn existing_filter_values(
    adhoc_filters: &[Value],
) -> Result<HashMap<String, Value>, MalformedInput> {
    let mut existing = HashMap::new();
    for filter in adhoc_filters {
        let filter = filter
            .as_object()
            .ok_or_else(|| MalformedInput::filter("adhoc_filters", "filter must be an object"))?;
        let expression_type = filter
            .get("expressionType")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MalformedInput::filter("adhoc_filters", "filter is missing 'expressionType'")
            })?;
        if expression_type != EXPRESSION_SIMPLE {
            continue;
        }
        let (Some(subject), Some(comparator)) = (
            filter.get("subject").filter(|value| !value.is_null()),
            filter.get("comparator").filter(|value| !value.is_null()),
        ) else {
            continue;
        };
        let operator = filter.get("operator").and_then(Value::as_str).unwrap_or_default();
        existing.insert(filter_key(subject, operator), comparator.clone());
    }
    Ok(existing)
}

fn filter_key(subject: &Value, operator: &str) -> String {
    match subject {
        Value::String(subject) => format!("{subject}__{operator}"),
        other => format!("{other}__{operator}"),
    }
}

fn same_comparator(existing: &Value, incoming: &Value) -> bool {
    match (existing, incoming) {
        (Value::Array(existing), Value::Array(incoming)) => as_set(existing) == as_set(incoming),
        (_, Value::Array(_)) => false,
        (existing, incoming) => existing == incoming,
    }
}

fn as_set(values: &[Value]) -> BTreeSet<String> {
    values.iter().map(Value::to_string).collect()
}

fn ensure_list(form_data: &mut FormData, key: &str) -> Result<(), MalformedInput> {
    match form_data.get(key) {
        None | Some(Value::Null) => {
            form_data.insert(key.to_string(), Value::Array(Vec::new()));
            Ok(())
        }
        Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(MalformedInput::filter(key, "expected a list")),
    }
}

fn list_mut<'a>(
    form_data: &'a mut FormData,
    key: &str,
) -> Result<&'a mut Vec<Value>, MalformedInput> {
    form_data
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| MalformedInput::filter(key, "expected a list"))
}

fn applied_time_extras(
    form_data: &mut FormData,
) -> Result<&mut Map<String, Value>, MalformedInput> {
    form_data
        .get_mut("applied_time_extras")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| MalformedInput::field_type("applied_time_extras", "an object"))
}
