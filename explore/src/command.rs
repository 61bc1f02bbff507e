//! Orchestration for a single explore state resolution.

use tracing::{Span, info};

use crate::assemble::{SliceSerializer, assemble};
use crate::core::pipeline::{MergeContext, MergePipeline};
use crate::core::types::{CommandParameters, ExploreResponse, RequestParams};
use crate::error::ExploreResult;
use crate::io::form_data_cache::FormDataCache;
use crate::io::permalink::PermalinkStore;
use crate::loader::SliceAndFormDataLoader;
use crate::resolve::{FormDataSource, SourceResolver};

/// Collaborators and request-scoped inputs for one command run.
///
/// `span` is the caller's logging handle; the whole run executes inside it.
pub struct ExploreContext<'a> {
    pub permalinks: &'a dyn PermalinkStore,
    pub form_data_cache: &'a dyn FormDataCache,
    pub loader: &'a dyn SliceAndFormDataLoader,
    pub serializer: &'a dyn SliceSerializer,
    pub request_params: &'a RequestParams,
    pub ignored_params: &'a [String],
    pub span: Span,
}

/// Resolves the form data that drives an explore view.
#[derive(Debug, Clone)]
pub struct GetExploreCommand {
    params: CommandParameters,
    pipeline: MergePipeline,
}

impl GetExploreCommand {
    pub fn new(params: CommandParameters) -> Self {
        Self {
            params,
            pipeline: MergePipeline::explore(),
        }
    }

    pub fn params(&self) -> &CommandParameters {
        &self.params
    }

    /// Resolve, load, merge, and assemble.
    ///
    /// Errors propagate unchanged; the only degraded success is a form-data
    /// cache miss with a slice fallback, reported through `message`.
    pub fn run(&self, ctx: &ExploreContext<'_>) -> ExploreResult<ExploreResponse> {
        let _entered = ctx.span.enter();

        let resolver = SourceResolver::new(ctx.permalinks, ctx.form_data_cache);
        let initial = resolver.resolve(&self.params)?;

        let (form_data, slice) = ctx
            .loader
            .load(self.params.slice_id, true, initial.form_data)?;

        let merge_ctx = MergeContext {
            request_params: ctx.request_params,
            ignored_params: ctx.ignored_params,
        };
        let form_data = self.pipeline.apply(form_data, &merge_ctx)?;

        info!(
            slice_id = slice.as_ref().map(|slice| slice.id),
            degraded = initial.message.is_some(),
            "explore state resolved"
        );
        Ok(assemble(
            form_data,
            slice.as_ref(),
            initial.message,
            ctx.serializer,
        ))
    }
}
