//! Test-only collaborators and fixtures for explore resolution.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use crate::assemble::SliceDataSerializer;
use crate::command::ExploreContext;
use crate::core::request_params::DEFAULT_IGNORED_PARAMS;
use crate::core::types::{
    Datasource, DatasourceRef, FormData, PermalinkValue, RequestParams, Slice,
};
use crate::error::{ExploreError, ExploreResult};
use crate::io::form_data_cache::FormDataCache;
use crate::io::permalink::PermalinkStore;
use crate::io::slices::SliceRepository;
use crate::io::store::{InitOptions, StorePaths, init_store};
use crate::loader::SliceFormDataLoader;

/// Unwrap a JSON object literal into form data.
pub fn form_data(value: Value) -> FormData {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Permalink value with the given form data and optional `urlParams`.
pub fn permalink(form: Value, url_params: Option<Value>) -> PermalinkValue {
    let mut state = json!({ "formData": form });
    if let Some(url_params) = url_params {
        state["urlParams"] = url_params;
    }
    serde_json::from_value(json!({ "state": state })).expect("valid permalink value")
}

/// Deterministic slice on a `table` datasource.
pub fn slice(id: i64, datasource_id: i64, params: Value) -> Slice {
    Slice {
        id,
        slice_name: format!("slice {id}"),
        viz_type: params
            .get("viz_type")
            .and_then(Value::as_str)
            .unwrap_or("table")
            .to_string(),
        description: None,
        datasource_id,
        datasource_type: "table".to_string(),
        params: form_data(params),
        cache_timeout: None,
        owners: vec!["admin".to_string()],
    }
}

/// Deterministic `table` datasource.
pub fn datasource(id: i64) -> Datasource {
    Datasource {
        id,
        kind: "table".to_string(),
        name: format!("table_{id}"),
    }
}

/// In-memory permalink store that counts lookups.
#[derive(Debug, Default)]
pub struct MemoryPermalinkStore {
    entries: HashMap<String, PermalinkValue>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MemoryPermalinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose every lookup fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with(mut self, key: &str, value: PermalinkValue) -> Self {
        self.entries.insert(key.to_string(), value);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PermalinkStore for MemoryPermalinkStore {
    fn get(&self, key: &str) -> ExploreResult<Option<PermalinkValue>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(ExploreError::store("permalink store", anyhow!(message.clone())));
        }
        Ok(self.entries.get(key).cloned())
    }
}

/// In-memory form-data cache that counts lookups.
#[derive(Debug, Default)]
pub struct MemoryFormDataCache {
    entries: HashMap<String, String>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MemoryFormDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose every lookup fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with(mut self, key: &str, raw: &str) -> Self {
        self.entries.insert(key.to_string(), raw.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FormDataCache for MemoryFormDataCache {
    fn get(&self, key: &str) -> ExploreResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(ExploreError::store("form data cache", anyhow!(message.clone())));
        }
        Ok(self.entries.get(key).cloned())
    }
}

/// In-memory slice repository.
#[derive(Debug, Default)]
pub struct MemorySliceRepository {
    slices: Vec<Slice>,
    datasources: Vec<Datasource>,
}

impl MemorySliceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slice(mut self, slice: Slice) -> Self {
        self.slices.push(slice);
        self
    }

    pub fn with_datasource(mut self, datasource: Datasource) -> Self {
        self.datasources.push(datasource);
        self
    }
}

impl SliceRepository for MemorySliceRepository {
    fn get_slice(&self, id: i64) -> ExploreResult<Option<Slice>> {
        Ok(self.slices.iter().find(|slice| slice.id == id).cloned())
    }

    fn get_datasource(&self, reference: &DatasourceRef) -> ExploreResult<Option<Datasource>> {
        Ok(self
            .datasources
            .iter()
            .find(|datasource| datasource.id == reference.id && datasource.kind == reference.kind)
            .cloned())
    }
}

/// In-memory collaborators seeded with slice 7 on datasource `3__table`.
pub struct Fixture {
    pub permalinks: MemoryPermalinkStore,
    pub cache: MemoryFormDataCache,
    pub loader: SliceFormDataLoader<MemorySliceRepository>,
    pub serializer: SliceDataSerializer,
    pub request_params: RequestParams,
    pub ignored_params: Vec<String>,
}

impl Fixture {
    pub fn new() -> Self {
        let repository = MemorySliceRepository::new()
            .with_slice(slice(7, 3, json!({"viz_type": "line", "metrics": ["count"]})))
            .with_datasource(datasource(3));
        Self {
            permalinks: MemoryPermalinkStore::new(),
            cache: MemoryFormDataCache::new(),
            loader: SliceFormDataLoader::new(repository),
            serializer: SliceDataSerializer,
            request_params: RequestParams::new(),
            ignored_params: DEFAULT_IGNORED_PARAMS.iter().map(|key| key.to_string()).collect(),
        }
    }

    pub fn with_permalink(mut self, key: &str, value: PermalinkValue) -> Self {
        self.permalinks = self.permalinks.with(key, value);
        self
    }

    pub fn with_cached(mut self, key: &str, raw: &str) -> Self {
        self.cache = self.cache.with(key, raw);
        self
    }

    pub fn with_request_params(mut self, pairs: &[(&str, &str)]) -> Self {
        self.request_params = RequestParams::from_pairs(pairs.iter().copied());
        self
    }

    pub fn context(&self) -> ExploreContext<'_> {
        ExploreContext {
            permalinks: &self.permalinks,
            form_data_cache: &self.cache,
            loader: &self.loader,
            serializer: &self.serializer,
            request_params: &self.request_params,
            ignored_params: &self.ignored_params,
            span: tracing::info_span!("explore_test"),
        }
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// File-backed store in a temporary directory.
pub struct TestStore {
    temp: tempfile::TempDir,
    paths: StorePaths,
}

impl TestStore {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let paths = init_store(&temp.path().join("data"), &InitOptions { force: false })?;
        Ok(Self { temp, paths })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn write_permalink(&self, key: &str, value: &Value) -> Result<()> {
        write_json(&self.paths.permalinks_dir.join(format!("{key}.json")), value)
    }

    pub fn write_cached(&self, key: &str, raw: &str) -> Result<()> {
        fs::write(self.paths.form_data_dir.join(format!("{key}.json")), raw)?;
        Ok(())
    }

    pub fn write_slices(&self, slices: &[Slice]) -> Result<()> {
        write_json(&self.paths.slices_path, &serde_json::to_value(slices)?)
    }

    pub fn write_datasources(&self, datasources: &[Datasource]) -> Result<()> {
        write_json(&self.paths.datasources_path, &serde_json::to_value(datasources)?)
    }
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(value)?;
    payload.push('\n');
    fs::write(path, payload).map_err(|err| anyhow!("write {}: {err}", path.display()))
}
