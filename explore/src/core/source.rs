//! Pure pieces of initial form-data resolution.

use serde_json::Value;

use crate::core::types::{CACHE_MISS_MESSAGE, FormData, PermalinkState};
use crate::error::MalformedInput;

/// Form data chosen before slice defaults and merge steps are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialFormData {
    pub form_data: FormData,
    /// Advisory set when a cache miss degraded to slice metadata.
    pub message: Option<String>,
}

/// Form data stored in a permalink, with its URL parameters under `url_params`.
pub fn form_data_from_permalink(state: PermalinkState) -> FormData {
    let mut form_data = state.form_data;
    if let Some(url_params) = state.url_params.filter(|params| !params.is_empty()) {
        form_data.insert("url_params".into(), Value::Object(url_params.into_mapping()));
    }
    form_data
}

/// Parse the JSON payload stored in the form-data cache.
pub fn parse_cached_form_data(key: &str, raw: &str) -> Result<FormData, MalformedInput> {
    let value: Value =
        serde_json::from_str(raw).map_err(|source| MalformedInput::CachedFormData {
            key: key.to_string(),
            source,
        })?;
    match value {
        Value::Object(form_data) => Ok(form_data),
        _ => Err(MalformedInput::CachedFormDataNotObject {
            key: key.to_string(),
        }),
    }
}

/// Fall back to a bare slice id when no source produced form data.
///
/// `from_cache_key` is true when the form data came from a form-data key
/// lookup (no permalink). Empty form data on that path means the cache had
/// nothing usable, so the advisory message is attached.
pub fn apply_slice_fallback(
    form_data: FormData,
    slice_id: Option<i64>,
    from_cache_key: bool,
) -> InitialFormData {
    let Some(slice_id) = slice_id.filter(|_| form_data.is_empty()) else {
        return InitialFormData {
            form_data,
            message: None,
        };
    };
    let mut form_data = form_data;
    form_data.insert("slice_id".into(), Value::from(slice_id));
    InitialFormData {
        form_data,
        message: from_cache_key.then(|| CACHE_MISS_MESSAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UrlParams;
    use crate::test_support::form_data as form;
    use serde_json::json;

    #[test]
    fn permalink_url_params_overwrite_existing_key() {
        let state = PermalinkState {
            form_data: form(json!({"viz_type": "line", "url_params": {"old": "1"}})),
            url_params: Some(UrlParams::Pairs(vec![("native_filters".into(), "x".into())])),
        };

        let form_data = form_data_from_permalink(state);

        assert_eq!(form_data["url_params"], json!({"native_filters": "x"}));
        assert_eq!(form_data["viz_type"], "line");
    }

    #[test]
    fn empty_permalink_url_params_are_ignored() {
        let state = PermalinkState {
            form_data: form(json!({"url_params": {"old": "1"}})),
            url_params: Some(UrlParams::Pairs(Vec::new())),
        };
        let form_data = form_data_from_permalink(state);
        assert_eq!(form_data["url_params"], json!({"old": "1"}));
    }

    #[test]
    fn cached_form_data_must_be_a_json_object() {
        let parsed = parse_cached_form_data("abc", r#"{"viz_type": "table"}"#).expect("parse");
        assert_eq!(parsed, form(json!({"viz_type": "table"})));

        let err = parse_cached_form_data("abc", "[1, 2]").expect_err("array");
        assert!(matches!(err, MalformedInput::CachedFormDataNotObject { .. }));

        let err = parse_cached_form_data("abc", "{not json").expect_err("invalid");
        assert!(matches!(err, MalformedInput::CachedFormData { .. }));
    }

    #[test]
    fn fallback_sets_slice_id_and_message_after_cache_lookup() {
        let initial = apply_slice_fallback(FormData::new(), Some(7), true);
        assert_eq!(initial.form_data, form(json!({"slice_id": 7})));
        assert_eq!(initial.message.as_deref(), Some(CACHE_MISS_MESSAGE));
    }

    #[test]
    fn fallback_without_cache_key_has_no_message() {
        let initial = apply_slice_fallback(FormData::new(), Some(7), false);
        assert_eq!(initial.form_data, form(json!({"slice_id": 7})));
        assert_eq!(initial.message, None);
    }

    #[test]
    fn fallback_keeps_resolved_form_data() {
        let resolved = form(json!({"viz_type": "table"}));
        let initial = apply_slice_fallback(resolved.clone(), Some(7), true);
        assert_eq!(initial.form_data, resolved);
        assert_eq!(initial.message, None);
    }

    #[test]
    fn fallback_without_slice_id_stays_empty() {
        let initial = apply_slice_fallback(FormData::new(), None, true);
        assert!(initial.form_data.is_empty());
        assert_eq!(initial.message, None);
    }
}
