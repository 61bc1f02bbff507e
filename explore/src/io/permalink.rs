//! Permalink store abstraction.
//!
//! The [`PermalinkStore`] trait decouples resolution from where permalinks
//! live. [`FsPermalinkStore`] reads them from the file-backed store and
//! validates each value against the embedded permalink schema.

use anyhow::{Context, anyhow};
use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::types::PermalinkValue;
use crate::error::{ExploreError, ExploreResult, MalformedInput};
use crate::io::store::{StorePaths, read_optional};

const PERMALINK_SCHEMA: &str = include_str!("../../schemas/permalink_value.schema.json");

const STORE_NAME: &str = "permalink store";

/// Lookup of saved exploration state by permalink key.
///
/// A clean miss is `Ok(None)`; a failing backend is `Err`.
pub trait PermalinkStore: Send + Sync {
    fn get(&self, key: &str) -> ExploreResult<Option<PermalinkValue>>;
}

/// Permalink store backed by `<data_dir>/permalinks/<key>.json`.
pub struct FsPermalinkStore {
    paths: StorePaths,
    validator: Validator,
}

impl FsPermalinkStore {
    pub fn new(paths: StorePaths) -> anyhow::Result<Self> {
        Ok(Self {
            paths,
            validator: permalink_validator()?,
        })
    }
}

impl PermalinkStore for FsPermalinkStore {
    #[instrument(skip(self))]
    fn get(&self, key: &str) -> ExploreResult<Option<PermalinkValue>> {
        let Some(path) = self.paths.permalink_path(key) else {
            debug!("permalink key is not a valid store key");
            return Ok(None);
        };
        let Some(contents) =
            read_optional(&path).map_err(|err| ExploreError::store(STORE_NAME, err))?
        else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("parse permalink {}", path.display()))
            .map_err(|err| ExploreError::store(STORE_NAME, err))?;
        if value.is_null() {
            return Ok(None);
        }
        decode_permalink_value(&self.validator, value).map(Some)
    }
}

/// Compile the embedded permalink schema.
pub fn permalink_validator() -> anyhow::Result<Validator> {
    let schema: Value = serde_json::from_str(PERMALINK_SCHEMA).context("parse permalink schema")?;
    jsonschema::validator_for(&schema).map_err(|err| anyhow!("invalid permalink schema: {err}"))
}

/// Validate a raw permalink value against the schema and decode it.
pub fn decode_permalink_value(
    validator: &Validator,
    value: Value,
) -> ExploreResult<PermalinkValue> {
    if !validator.is_valid(&value) {
        let messages = validator
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(MalformedInput::PermalinkState {
            reason: messages.join("; "),
        }
        .into());
    }
    serde_json::from_value(value).map_err(|err| {
        MalformedInput::PermalinkState {
            reason: err.to_string(),
        }
        .into()
    })
}
