//! Slice-derived defaults applied to resolved form data.

use serde_json::Value;

use crate::core::types::{FormData, is_truthy};
use crate::error::MalformedInput;

/// Keys that on their own do not amount to a chart definition.
const SLICE_ONLY_KEYS: [&str; 4] = ["slice_id", "extra_filters", "adhoc_filters", "viz_type"];

/// Slice id carried by the form data itself, if any. Falsy values count as absent.
pub fn slice_id_from_form_data(form_data: &FormData) -> Result<Option<i64>, MalformedInput> {
    let Some(value) = form_data.get("slice_id").filter(|value| is_truthy(value)) else {
        return Ok(None);
    };
    let id = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.map(Some)
        .ok_or_else(|| MalformedInput::field_type("slice_id", "an integer"))
}

/// True when the form data holds nothing beyond a slice reference and filters.
pub fn references_slice_only(form_data: &FormData) -> bool {
    form_data
        .keys()
        .all(|key| SLICE_ONLY_KEYS.contains(&key.as_str()))
}

/// Slice params overlaid with the resolved form data (resolved values win).
pub fn overlay_slice_params(slice_params: &FormData, form_data: FormData) -> FormData {
    let mut merged = slice_params.clone();
    for (key, value) in form_data {
        merged.insert(key, value);
    }
    merged
}

/// Fold legacy `since`/`until` bounds into `time_range`.
pub fn update_time_range(mut form_data: FormData) -> FormData {
    if !form_data.contains_key("since") && !form_data.contains_key("until") {
        return form_data;
    }
    let since = bound_text(form_data.shift_remove("since"));
    let until = bound_text(form_data.shift_remove("until"));
    form_data.insert("time_range".into(), Value::String(format!("{since} : {until}")));
    form_data
}

fn bound_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::form_data as form;
    use serde_json::json;

    #[test]
    fn slice_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(slice_id_from_form_data(&form(json!({"slice_id": 7}))).expect("id"), Some(7));
        assert_eq!(slice_id_from_form_data(&form(json!({"slice_id": "8"}))).expect("id"), Some(8));
        assert_eq!(slice_id_from_form_data(&form(json!({"slice_id": 0}))).expect("id"), None);
        assert_eq!(slice_id_from_form_data(&FormData::new()).expect("id"), None);
        assert!(slice_id_from_form_data(&form(json!({"slice_id": "seven"}))).is_err());
    }

    #[test]
    fn slice_only_detection() {
        assert!(references_slice_only(&form(json!({"slice_id": 1, "viz_type": "pie"}))));
        assert!(!references_slice_only(&form(json!({"slice_id": 1, "metrics": []}))));
    }

    #[test]
    fn resolved_values_win_over_slice_params() {
        let params = form(json!({"viz_type": "line", "row_limit": 100}));
        let merged = overlay_slice_params(&params, form(json!({"row_limit": 10, "slice_id": 7})));
        assert_eq!(merged, form(json!({"viz_type": "line", "row_limit": 10, "slice_id": 7})));
    }

    #[test]
    fn since_until_become_time_range() {
        let updated = update_time_range(form(json!({"since": "2020-01-01", "until": null})));
        assert_eq!(updated, form(json!({"time_range": "2020-01-01 : "})));

        let untouched = update_time_range(form(json!({"time_range": "Last day"})));
        assert_eq!(untouched, form(json!({"time_range": "Last day"})));
    }
}
