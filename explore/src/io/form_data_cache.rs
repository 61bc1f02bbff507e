//! Form-data cache abstraction.
//!
//! Cached entries are ephemeral: a miss is expected and is not an error.

use tracing::{debug, instrument};

use crate::error::{ExploreError, ExploreResult};
use crate::io::store::{StorePaths, read_optional};

const STORE_NAME: &str = "form data cache";

/// Lookup of JSON-encoded form data by key.
///
/// A clean miss is `Ok(None)`; a failing backend is `Err`.
pub trait FormDataCache: Send + Sync {
    fn get(&self, key: &str) -> ExploreResult<Option<String>>;
}

/// Cache backed by `<data_dir>/form_data/<key>.json`. Entries are returned raw.
pub struct FsFormDataCache {
    paths: StorePaths,
}

impl FsFormDataCache {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }
}

impl FormDataCache for FsFormDataCache {
    #[instrument(skip(self))]
    fn get(&self, key: &str) -> ExploreResult<Option<String>> {
        let Some(path) = self.paths.form_data_path(key) else {
            debug!("form data key is not a valid store key");
            return Ok(None);
        };
        read_optional(&path).map_err(|err| ExploreError::store(STORE_NAME, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::{InitOptions, init_store};
    use std::fs;

    #[test]
    fn returns_raw_entry_or_miss() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_store(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(paths.form_data_dir.join("abc.json"), r#"{"viz_type": "pie"}"#).expect("write");
        let cache = FsFormDataCache::new(paths);

        assert_eq!(
            cache.get("abc").expect("get").as_deref(),
            Some(r#"{"viz_type": "pie"}"#)
        );
        assert_eq!(cache.get("missing").expect("get"), None);
        assert_eq!(cache.get("a/b").expect("get"), None);
    }

    #[test]
    fn unreadable_entry_is_a_store_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_store(temp.path(), &InitOptions { force: false }).expect("init");
        fs::create_dir_all(paths.form_data_dir.join("dir.json")).expect("mkdir");
        let cache = FsFormDataCache::new(paths);

        let err = cache.get("dir").expect_err("store error");
        assert!(matches!(err, ExploreError::Store { .. }));
    }
}
