//! Shared types for explore state resolution.
//!
//! These types are the contracts between the resolver, the loader, the merge
//! steps and the assembled response. They carry no I/O.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MalformedInput;

/// Chart configuration mapping. Keys are merged and overwritten by identity.
pub type FormData = Map<String, Value>;

/// Advisory surfaced when a form-data cache miss degrades to slice metadata.
pub const CACHE_MISS_MESSAGE: &str = "Form data not found in cache, reverting to chart metadata.";

/// Input of a single explore resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParameters {
    pub permalink_key: Option<String>,
    pub form_data_key: Option<String>,
    pub slice_id: Option<i64>,
}

impl CommandParameters {
    /// Form-data key, with the empty string treated as unset.
    pub fn form_data_key(&self) -> Option<&str> {
        self.form_data_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Slice id usable for the bare slice-id fallback (`0` counts as unset).
    pub fn fallback_slice_id(&self) -> Option<i64> {
        self.slice_id.filter(|id| *id != 0)
    }
}

/// Stored permalink envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermalinkValue {
    pub state: PermalinkState,
}

/// Exploration state snapshot saved behind a permalink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermalinkState {
    #[serde(rename = "formData")]
    pub form_data: FormData,
    #[serde(rename = "urlParams", default, skip_serializing_if = "Option::is_none")]
    pub url_params: Option<UrlParams>,
}

/// URL parameters captured with a permalink.
///
/// The permalink service stores them as `[key, value]` pairs; an object form
/// is accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlParams {
    Pairs(Vec<(String, String)>),
    Map(Map<String, Value>),
}

impl UrlParams {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }

    /// Plain mapping; later pairs win over earlier ones with the same key.
    pub fn into_mapping(self) -> Map<String, Value> {
        match self {
            Self::Pairs(pairs) => pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
            Self::Map(map) => map,
        }
    }
}

/// Saved chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub id: i64,
    pub slice_name: String,
    pub viz_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub datasource_id: i64,
    pub datasource_type: String,
    /// Form data the chart was saved with.
    #[serde(default)]
    pub params: FormData,
    #[serde(default)]
    pub cache_timeout: Option<u32>,
    #[serde(default)]
    pub owners: Vec<String>,
}

impl Slice {
    pub fn datasource_ref(&self) -> DatasourceRef {
        DatasourceRef {
            id: self.datasource_id,
            kind: self.datasource_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasource {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

/// Datasource reference as written in form data: `"<id>__<type>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceRef {
    pub id: i64,
    pub kind: String,
}

impl DatasourceRef {
    pub fn parse(raw: &str) -> Result<Self, MalformedInput> {
        let malformed = || MalformedInput::DatasourceRef {
            value: raw.to_string(),
        };
        let (id, kind) = raw.split_once("__").ok_or_else(malformed)?;
        let id = id.parse::<i64>().map_err(|_| malformed())?;
        if kind.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            id,
            kind: kind.to_string(),
        })
    }
}

impl fmt::Display for DatasourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}", self.id, self.kind)
    }
}

/// Serialized chart attributes returned alongside the form data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceData {
    pub slice_id: i64,
    pub slice_name: String,
    pub viz_type: String,
    pub description: Option<String>,
    pub datasource: String,
    pub cache_timeout: Option<u32>,
    pub owners: Vec<String>,
    pub form_data: FormData,
    pub slice_url: String,
}

/// Resolved explore state. Every field is always serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreResponse {
    pub form_data: FormData,
    pub slice: Option<SliceData>,
    pub message: Option<String>,
    /// Reserved; always `None`.
    pub metadata: Option<Map<String, Value>>,
}

/// Value of a query parameter: repeated parameters become a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ParamValue {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Single(value) => Value::String(value.clone()),
            Self::Multiple(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Query parameters of the incoming request, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: Vec<(String, ParamValue)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group raw `key=value` pairs, collecting repeated keys into a list.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.push(key.into(), value.into());
        }
        params
    }

    pub fn push(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => {
                let previous = std::mem::replace(slot, ParamValue::Multiple(Vec::new()));
                *slot = match previous {
                    ParamValue::Single(first) => ParamValue::Multiple(vec![first, value]),
                    ParamValue::Multiple(mut values) => {
                        values.push(value);
                        ParamValue::Multiple(values)
                    }
                };
            }
            None => self.entries.push((key, ParamValue::Single(value))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Truthiness of a JSON value: null, false, zero and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
