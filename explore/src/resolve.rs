//! Initial form-data resolution across permalinks, the form-data cache and
//! the bare slice-id fallback.

use tracing::{debug, info, instrument, warn};

use crate::core::source::{
    InitialFormData, apply_slice_fallback, form_data_from_permalink, parse_cached_form_data,
};
use crate::core::types::{CommandParameters, FormData};
use crate::error::{ExploreError, ExploreResult};
use crate::io::form_data_cache::FormDataCache;
use crate::io::permalink::PermalinkStore;

/// Strategy producing the initial form data for a request.
pub trait FormDataSource {
    fn resolve(&self, params: &CommandParameters) -> ExploreResult<InitialFormData>;
}

/// Strict-precedence resolver: permalink, then cache, then slice id.
///
/// A permalink that resolves to nothing is fatal. A cache miss is not: it
/// degrades to the slice id and attaches an advisory message. Whatever the
/// source, empty form data is completed with the request's slice id.
pub struct SourceResolver<'a> {
    permalinks: &'a dyn PermalinkStore,
    form_data_cache: &'a dyn FormDataCache,
}

impl<'a> SourceResolver<'a> {
    pub fn new(permalinks: &'a dyn PermalinkStore, form_data_cache: &'a dyn FormDataCache) -> Self {
        Self {
            permalinks,
            form_data_cache,
        }
    }
}

impl FormDataSource for SourceResolver<'_> {
    #[instrument(skip_all, fields(
        permalink_key = ?params.permalink_key,
        form_data_key = ?params.form_data_key(),
        slice_id = ?params.slice_id,
    ))]
    fn resolve(&self, params: &CommandParameters) -> ExploreResult<InitialFormData> {
        let (form_data, from_cache_key) = if let Some(key) = params.permalink_key.as_deref() {
            let Some(value) = self.permalinks.get(key)? else {
                warn!("permalink resolved to nothing");
                return Err(ExploreError::PermalinkGetFailed {
                    key: key.to_string(),
                });
            };
            debug!("form data resolved from permalink");
            (form_data_from_permalink(value.state), false)
        } else if let Some(key) = params.form_data_key() {
            let form_data = match self.form_data_cache.get(key)? {
                Some(raw) if !raw.is_empty() => {
                    let form_data = parse_cached_form_data(key, &raw)?;
                    debug!(keys = form_data.len(), "form data resolved from cache");
                    form_data
                }
                _ => {
                    info!("form data not found in cache");
                    FormData::new()
                }
            };
            (form_data, true)
        } else {
            (FormData::new(), false)
        };

        Ok(apply_slice_fallback(
            form_data,
            params.fallback_slice_id(),
            from_cache_key,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CACHE_MISS_MESSAGE;
    use crate::error::MalformedInput;
    use crate::test_support::{MemoryFormDataCache, MemoryPermalinkStore, form_data, permalink};
    use serde_json::json;

    fn params(
        permalink: Option<&str>,
        form_data_key: Option<&str>,
        slice_id: Option<i64>,
    ) -> CommandParameters {
        CommandParameters {
            permalink_key: permalink.map(str::to_string),
            form_data_key: form_data_key.map(str::to_string),
            slice_id,
        }
    }

    #[test]
    fn permalink_takes_precedence_and_skips_cache() {
        let permalinks = MemoryPermalinkStore::new().with(
            "p1",
            permalink(json!({"viz_type": "bar"}), Some(json!([["native_filters", "()"]]))),
        );
        let cache = MemoryFormDataCache::new().with("abc", r#"{"viz_type": "pie"}"#);
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver
            .resolve(&params(Some("p1"), Some("abc"), Some(7)))
            .expect("resolve");

        assert_eq!(
            initial.form_data,
            form_data(json!({"viz_type": "bar", "url_params": {"native_filters": "()"}}))
        );
        assert_eq!(initial.message, None);
        assert_eq!(permalinks.calls(), 1);
        assert_eq!(cache.calls(), 0);
    }

    #[test]
    fn dangling_permalink_is_fatal() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new().with("abc", r#"{"viz_type": "pie"}"#);
        let resolver = SourceResolver::new(&permalinks, &cache);

        let err = resolver
            .resolve(&params(Some("gone"), Some("abc"), Some(7)))
            .expect_err("fatal");

        assert!(matches!(err, ExploreError::PermalinkGetFailed { ref key } if key == "gone"));
        assert_eq!(cache.calls(), 0);
    }

    #[test]
    fn permalink_store_failure_is_not_a_miss() {
        let permalinks = MemoryPermalinkStore::failing("connection reset");
        let cache = MemoryFormDataCache::new().with("abc", r#"{"viz_type": "pie"}"#);
        let resolver = SourceResolver::new(&permalinks, &cache);

        let err = resolver
            .resolve(&params(Some("p1"), Some("abc"), Some(7)))
            .expect_err("store");

        assert!(matches!(err, ExploreError::Store { store: "permalink store", .. }));
        assert_eq!(cache.calls(), 0);
    }

    #[test]
    fn empty_permalink_form_data_takes_slice_id_without_message() {
        let permalinks = MemoryPermalinkStore::new().with("p1", permalink(json!({}), None));
        let cache = MemoryFormDataCache::new();
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver
            .resolve(&params(Some("p1"), Some("abc"), Some(7)))
            .expect("resolve");

        assert_eq!(initial.form_data, form_data(json!({"slice_id": 7})));
        assert_eq!(initial.message, None);
        assert_eq!(cache.calls(), 0);
    }

    #[test]
    fn cache_hit_is_used_verbatim() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new().with("abc", r#"{"viz_type": "pie", "slice_id": 3}"#);
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver.resolve(&params(None, Some("abc"), Some(7))).expect("resolve");

        assert_eq!(initial.form_data, form_data(json!({"viz_type": "pie", "slice_id": 3})));
        assert_eq!(initial.message, None);
        assert_eq!(permalinks.calls(), 0);
    }

    #[test]
    fn cache_miss_with_slice_id_reverts_to_chart() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new();
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver.resolve(&params(None, Some("abc"), Some(7))).expect("resolve");

        assert_eq!(initial.form_data, form_data(json!({"slice_id": 7})));
        assert_eq!(initial.message.as_deref(), Some(CACHE_MISS_MESSAGE));
    }

    #[test]
    fn empty_cached_value_is_a_miss() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new().with("abc", "");
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver.resolve(&params(None, Some("abc"), Some(7))).expect("resolve");

        assert_eq!(initial.form_data, form_data(json!({"slice_id": 7})));
        assert_eq!(initial.message.as_deref(), Some(CACHE_MISS_MESSAGE));
    }

    #[test]
    fn empty_cached_object_reverts_to_chart_with_message() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new().with("abc", "{}");
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver.resolve(&params(None, Some("abc"), Some(7))).expect("resolve");

        assert_eq!(initial.form_data, form_data(json!({"slice_id": 7})));
        assert_eq!(initial.message.as_deref(), Some(CACHE_MISS_MESSAGE));
    }

    #[test]
    fn cache_miss_without_slice_id_stays_empty() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new();
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver.resolve(&params(None, Some("abc"), None)).expect("resolve");

        assert!(initial.form_data.is_empty());
        assert_eq!(initial.message, None);
    }

    #[test]
    fn empty_form_data_key_is_not_looked_up() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new();
        let resolver = SourceResolver::new(&permalinks, &cache);

        let initial = resolver.resolve(&params(None, Some(""), Some(7))).expect("resolve");

        assert_eq!(initial.form_data, form_data(json!({"slice_id": 7})));
        assert_eq!(initial.message, None);
        assert_eq!(cache.calls(), 0);
    }

    #[test]
    fn unparseable_cache_entry_is_malformed() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::new().with("abc", "{broken");
        let resolver = SourceResolver::new(&permalinks, &cache);

        let err = resolver.resolve(&params(None, Some("abc"), Some(7))).expect_err("malformed");

        assert!(matches!(
            err,
            ExploreError::Malformed(MalformedInput::CachedFormData { .. })
        ));
    }

    #[test]
    fn cache_backend_failure_propagates() {
        let permalinks = MemoryPermalinkStore::new();
        let cache = MemoryFormDataCache::failing("connection refused");
        let resolver = SourceResolver::new(&permalinks, &cache);

        let err = resolver.resolve(&params(None, Some("abc"), Some(7))).expect_err("store");

        assert!(matches!(err, ExploreError::Store { .. }));
    }
}
