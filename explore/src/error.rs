//! Error taxonomy for explore state resolution.
//!
//! Every variant propagates unchanged out of `GetExploreCommand::run`. The one
//! degraded path (form-data cache miss with a slice fallback) is not an error
//! and never appears here.

use std::fmt;

use thiserror::Error;

pub type ExploreResult<T> = Result<T, ExploreError>;

#[derive(Debug, Error)]
pub enum ExploreError {
    /// A permalink key was supplied but resolved to nothing.
    #[error("error while retrieving permalink '{key}'")]
    PermalinkGetFailed { key: String },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error(transparent)]
    Malformed(#[from] MalformedInput),

    /// The backing store of a collaborator failed (as opposed to a clean miss).
    #[error("{store} failed")]
    Store {
        store: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ExploreError {
    pub fn store(store: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Store {
            store,
            source: source.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Input that was present but could not be interpreted.
#[derive(Debug, Error)]
pub enum MalformedInput {
    #[error("cached form data for key '{key}' is not valid JSON: {source}")]
    CachedFormData {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cached form data for key '{key}' is not a JSON object")]
    CachedFormDataNotObject { key: String },

    #[error("malformed filter in '{field}': {reason}")]
    Filter { field: String, reason: String },

    #[error("malformed datasource reference '{value}' (expected '<id>__<type>')")]
    DatasourceRef { value: String },

    #[error("malformed permalink state: {reason}")]
    PermalinkState { reason: String },

    #[error("form data field '{field}' must be {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },
}

impl MalformedInput {
    pub(crate) fn filter(field: &str, reason: impl Into<String>) -> Self {
        Self::Filter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn field_type(field: &str, expected: &'static str) -> Self {
        Self::FieldType {
            field: field.to_string(),
            expected,
        }
    }
}

/// Entities a lookup can fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Chart,
    Datasource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chart => f.write_str("chart"),
            Self::Datasource => f.write_str("datasource"),
        }
    }
}
