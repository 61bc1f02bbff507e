//! Ordered normalization of resolved form data.
//!
//! Each step is a pure `FormData -> FormData` transformation. Order matters:
//! extra-filter merging relies on `adhoc_filters` materialized by the legacy
//! migration, and request parameters are applied last so they win.

use crate::core::extra_filters::merge_extra_filters;
use crate::core::legacy_filters::convert_legacy_filters_into_adhoc;
use crate::core::request_params::merge_request_params;
use crate::core::types::{FormData, RequestParams};
use crate::error::MalformedInput;

/// Request-scoped inputs available to merge steps.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    pub request_params: &'a RequestParams,
    pub ignored_params: &'a [String],
}

pub type MergeStep = fn(FormData, &MergeContext<'_>) -> Result<FormData, MalformedInput>;

/// Named merge steps applied left to right.
#[derive(Debug, Clone)]
pub struct MergePipeline {
    steps: Vec<(&'static str, MergeStep)>,
}

impl MergePipeline {
    /// Legacy-filter migration, extra-filter merge, request-parameter merge.
    pub fn explore() -> Self {
        Self {
            steps: vec![
                ("legacy_filters", legacy_filters_step as MergeStep),
                ("extra_filters", extra_filters_step as MergeStep),
                ("request_params", request_params_step as MergeStep),
            ],
        }
    }

    pub fn step_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|(name, _)| *name)
    }

    pub fn apply(
        &self,
        form_data: FormData,
        ctx: &MergeContext<'_>,
    ) -> Result<FormData, MalformedInput> {
        self.steps
            .iter()
            .try_fold(form_data, |form_data, (_, step)| step(form_data, ctx))
    }
}

fn legacy_filters_step(
    form_data: FormData,
    _: &MergeContext<'_>,
) -> Result<FormData, MalformedInput> {
    convert_legacy_filters_into_adhoc(form_data)
}

fn extra_filters_step(
    form_data: FormData,
    _: &MergeContext<'_>,
) -> Result<FormData, MalformedInput> {
    merge_extra_filters(form_data)
}

fn request_params_step(
    form_data: FormData,
    ctx: &MergeContext<'_>,
) -> Result<FormData, MalformedInput> {
    merge_request_params(form_data, ctx.request_params, ctx.ignored_params)
}

impl Default for MergePipeline {
    fn default() -> Self {
        Self::explore()
    }
}
