//! Merging of request query parameters into `form_data.url_params`.

use serde_json::{Map, Value};

use crate::core::types::{FormData, RequestParams};
use crate::error::MalformedInput;

/// Parameters never copied into `url_params` by default.
pub const DEFAULT_IGNORED_PARAMS: [&str; 2] = ["form_data", "r"];

/// Copy request parameters into `url_params`; request values win over
/// existing entries with the same key.
pub fn merge_request_params(
    mut form_data: FormData,
    params: &RequestParams,
    ignored: &[String],
) -> Result<FormData, MalformedInput> {
    let slot = form_data
        .entry("url_params")
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    let url_params = slot
        .as_object_mut()
        .ok_or_else(|| MalformedInput::field_type("url_params", "an object"))?;

    for (key, value) in params.iter() {
        if ignored.iter().any(|skip| skip == key) {
            continue;
        }
        url_params.insert(key.to_string(), value.to_value());
    }
    Ok(form_data)
}
