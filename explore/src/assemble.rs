//! Response assembly.

use serde_json::Value;

use crate::core::types::{ExploreResponse, FormData, Slice, SliceData};

/// Serializes a slice for the explore response.
pub trait SliceSerializer: Send + Sync {
    fn serialize(&self, slice: &Slice) -> SliceData;
}

/// Default serializer: slice attributes plus its saved form data completed
/// with `slice_id` and `datasource`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceDataSerializer;

impl SliceSerializer for SliceDataSerializer {
    fn serialize(&self, slice: &Slice) -> SliceData {
        let datasource = slice.datasource_ref().to_string();
        let mut form_data = slice.params.clone();
        form_data.insert("slice_id".into(), Value::from(slice.id));
        form_data.insert("datasource".into(), Value::String(datasource.clone()));
        SliceData {
            slice_id: slice.id,
            slice_name: slice.slice_name.clone(),
            viz_type: slice.viz_type.clone(),
            description: slice.description.clone(),
            datasource,
            cache_timeout: slice.cache_timeout,
            owners: slice.owners.clone(),
            form_data,
            slice_url: format!("/explore/?slice_id={}", slice.id),
        }
    }
}

/// Package the resolved state. `metadata` is reserved and always `None`.
pub fn assemble(
    form_data: FormData,
    slice: Option<&Slice>,
    message: Option<String>,
    serializer: &dyn SliceSerializer,
) -> ExploreResponse {
    ExploreResponse {
        form_data,
        slice: slice.map(|slice| serializer.serialize(slice)),
        message,
        metadata: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{form_data, slice};
    use serde_json::json;

    #[test]
    fn serializes_slice_with_completed_form_data() {
        let slice = slice(7, 3, json!({"viz_type": "line"}));
        let data = SliceDataSerializer.serialize(&slice);

        assert_eq!(data.slice_id, 7);
        assert_eq!(data.datasource, "3__table");
        assert_eq!(data.slice_url, "/explore/?slice_id=7");
        assert_eq!(
            data.form_data,
            form_data(json!({"viz_type": "line", "slice_id": 7, "datasource": "3__table"}))
        );
    }

    #[test]
    fn absent_slice_serializes_as_null() {
        let response = assemble(FormData::new(), None, None, &SliceDataSerializer);
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["slice"], Value::Null);
        assert_eq!(value["metadata"], Value::Null);
        assert!(value.as_object().is_some_and(|map| map.contains_key("metadata")));
    }
}
