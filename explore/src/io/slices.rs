//! Slice and datasource lookup.

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::core::types::{Datasource, DatasourceRef, Slice};
use crate::error::{ExploreError, ExploreResult};
use crate::io::store::{StorePaths, read_optional};

const STORE_NAME: &str = "slice repository";

/// Read access to saved charts and their datasources.
pub trait SliceRepository: Send + Sync {
    fn get_slice(&self, id: i64) -> ExploreResult<Option<Slice>>;
    fn get_datasource(&self, reference: &DatasourceRef) -> ExploreResult<Option<Datasource>>;
}

/// Repository backed by `slices.json` and `datasources.json`.
///
/// Indexes are read on every lookup; nothing is cached between requests.
pub struct FsSliceRepository {
    paths: StorePaths,
}

impl FsSliceRepository {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }
}

impl SliceRepository for FsSliceRepository {
    #[instrument(skip(self))]
    fn get_slice(&self, id: i64) -> ExploreResult<Option<Slice>> {
        let slices: Vec<Slice> = load_index(&self.paths.slices_path)?;
        let found = slices.into_iter().find(|slice| slice.id == id);
        debug!(found = found.is_some(), "slice lookup");
        Ok(found)
    }

    #[instrument(skip(self), fields(datasource = %reference))]
    fn get_datasource(&self, reference: &DatasourceRef) -> ExploreResult<Option<Datasource>> {
        let datasources: Vec<Datasource> = load_index(&self.paths.datasources_path)?;
        Ok(datasources
            .into_iter()
            .find(|datasource| datasource.id == reference.id && datasource.kind == reference.kind))
    }
}

fn load_index<T: DeserializeOwned>(path: &Path) -> ExploreResult<Vec<T>> {
    let Some(contents) = read_optional(path).map_err(|err| ExploreError::store(STORE_NAME, err))?
    else {
        return Ok(Vec::new());
    };
    serde_json::from_str(&contents)
        .with_context(|| format!("parse {}", path.display()))
        .map_err(|err| ExploreError::store(STORE_NAME, err))
}
