//! Shared application state for the explore server.

use std::sync::Arc;

use anyhow::Result;
use explore::assemble::{SliceDataSerializer, SliceSerializer};
use explore::io::form_data_cache::{FormDataCache, FsFormDataCache};
use explore::io::permalink::{FsPermalinkStore, PermalinkStore};
use explore::io::slices::FsSliceRepository;
use explore::io::store::StorePaths;
use explore::loader::{SliceAndFormDataLoader, SliceFormDataLoader};

/// Collaborators shared by all request handlers.
///
/// Every field is behind an `Arc` so a request can move a cheap clone into a
/// blocking task.
#[derive(Clone)]
pub struct AppState {
    pub permalinks: Arc<dyn PermalinkStore>,
    pub form_data_cache: Arc<dyn FormDataCache>,
    pub loader: Arc<dyn SliceAndFormDataLoader>,
    pub serializer: Arc<dyn SliceSerializer>,
    /// Query parameters never copied into `url_params`.
    pub ignored_params: Arc<[String]>,
}

impl AppState {
    /// File-backed state rooted at `paths`.
    pub fn from_store(paths: StorePaths, ignored_params: Vec<String>) -> Result<Self> {
        Ok(Self {
            permalinks: Arc::new(FsPermalinkStore::new(paths.clone())?),
            form_data_cache: Arc::new(FsFormDataCache::new(paths.clone())),
            loader: Arc::new(SliceFormDataLoader::new(FsSliceRepository::new(paths))),
            serializer: Arc::new(SliceDataSerializer),
            ignored_params: ignored_params.into(),
        })
    }
}
