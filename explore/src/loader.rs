//! Authoritative form data and slice loading.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::slice_defaults::{
    overlay_slice_params, references_slice_only, slice_id_from_form_data, update_time_range,
};
use crate::core::types::{DatasourceRef, FormData, Slice};
use crate::error::{EntityKind, ExploreError, ExploreResult, MalformedInput};
use crate::io::slices::SliceRepository;

/// Turns initial form data into the authoritative form data and its slice.
pub trait SliceAndFormDataLoader: Send + Sync {
    fn load(
        &self,
        slice_id: Option<i64>,
        use_slice_data: bool,
        initial: FormData,
    ) -> ExploreResult<(FormData, Option<Slice>)>;
}

/// Loader that fills form data from the saved slice and checks that the
/// referenced datasource exists.
pub struct SliceFormDataLoader<R> {
    repository: R,
}

impl<R: SliceRepository> SliceFormDataLoader<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

impl<R: SliceRepository> SliceAndFormDataLoader for SliceFormDataLoader<R> {
    #[instrument(skip(self, initial), fields(initial_keys = initial.len()))]
    fn load(
        &self,
        slice_id: Option<i64>,
        use_slice_data: bool,
        initial: FormData,
    ) -> ExploreResult<(FormData, Option<Slice>)> {
        let slice_id = slice_id_from_form_data(&initial)?.or(slice_id.filter(|id| *id != 0));

        let mut form_data = initial;
        let mut slice = None;
        if let Some(id) = slice_id {
            if use_slice_data || references_slice_only(&form_data) {
                let found = self
                    .repository
                    .get_slice(id)?
                    .ok_or_else(|| ExploreError::not_found(EntityKind::Chart, id))?;
                debug!(slice_id = id, "overlaying slice params");
                form_data = overlay_slice_params(&found.params, form_data);
                slice = Some(found);
            }
        }
        let mut form_data = update_time_range(form_data);

        let reference = match form_data.get("datasource") {
            None | Some(Value::Null) => slice.as_ref().map(Slice::datasource_ref),
            Some(Value::String(raw)) => Some(DatasourceRef::parse(raw)?),
            Some(_) => return Err(MalformedInput::field_type("datasource", "a string").into()),
        };
        if let Some(reference) = reference {
            if self.repository.get_datasource(&reference)?.is_none() {
                return Err(ExploreError::not_found(EntityKind::Datasource, &reference));
            }
            form_data.insert("datasource".into(), Value::String(reference.to_string()));
        }

        Ok((form_data, slice))
    }
}
