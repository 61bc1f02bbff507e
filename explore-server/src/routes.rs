//! HTTP route handlers for the explore API.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info_span, warn};

use explore::command::{ExploreContext, GetExploreCommand};
use explore::core::types::{CommandParameters, ExploreResponse, ParamValue, RequestParams};
use explore::error::ExploreError;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/explore/", get(get_explore))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct ExploreEnvelope {
    pub result: ExploreResponse,
}

/// Failure of an API request, rendered as `{"message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Explore(ExploreError),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Explore(err) => match err {
                ExploreError::PermalinkGetFailed { .. } | ExploreError::NotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                ExploreError::Malformed(_) => StatusCode::BAD_REQUEST,
                ExploreError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) | ApiError::Internal(message) => message.clone(),
            ApiError::Explore(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "explore request failed");
        } else {
            warn!(status = status.as_u16(), message = %self.message(), "explore request rejected");
        }
        (status, Json(json!({ "message": self.message() }))).into_response()
    }
}

/// GET /api/v1/explore/ - resolve explore state from query parameters.
///
/// `permalink_key`, `form_data_key` and `slice_id` select the sources; every
/// query parameter is also offered to the `url_params` merge.
async fn get_explore(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ExploreEnvelope>, ApiError> {
    let request_params = RequestParams::from_pairs(pairs);
    let params = command_parameters(&request_params)?;

    let span = info_span!(
        "explore_request",
        permalink_key = params.permalink_key.as_deref(),
        form_data_key = params.form_data_key.as_deref(),
        slice_id = params.slice_id,
    );
    let command = GetExploreCommand::new(params);

    let result = tokio::task::spawn_blocking(move || {
        let ctx = ExploreContext {
            permalinks: state.permalinks.as_ref(),
            form_data_cache: state.form_data_cache.as_ref(),
            loader: state.loader.as_ref(),
            serializer: state.serializer.as_ref(),
            request_params: &request_params,
            ignored_params: &state.ignored_params,
            span,
        };
        command.run(&ctx)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("explore task failed: {err}")))?;

    result
        .map(|result| Json(ExploreEnvelope { result }))
        .map_err(ApiError::Explore)
}

/// Extract the command's source selectors from the query string.
fn command_parameters(request_params: &RequestParams) -> Result<CommandParameters, ApiError> {
    let slice_id = match first(request_params, "slice_id") {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::BadRequest(format!("slice_id must be an integer, got '{raw}'"))
        })?),
    };
    Ok(CommandParameters {
        permalink_key: first(request_params, "permalink_key").map(str::to_string),
        form_data_key: first(request_params, "form_data_key").map(str::to_string),
        slice_id,
    })
}

fn first<'a>(request_params: &'a RequestParams, key: &str) -> Option<&'a str> {
    match request_params.get(key)? {
        ParamValue::Single(value) => Some(value.as_str()),
        ParamValue::Multiple(values) => values.first().map(String::as_str),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explore::core::request_params::DEFAULT_IGNORED_PARAMS;
    use explore::core::types::CACHE_MISS_MESSAGE;
    use explore::error::{EntityKind, MalformedInput};
    use explore::test_support::{TestStore, datasource, slice};

    fn pairs(raw: &[(&str, &str)]) -> Query<Vec<(String, String)>> {
        Query(
            raw.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    fn app_state(store: &TestStore) -> AppState {
        store
            .write_slices(&[slice(7, 3, serde_json::json!({"viz_type": "line"}))])
            .expect("write slices");
        store.write_datasources(&[datasource(3)]).expect("write datasources");
        let ignored = DEFAULT_IGNORED_PARAMS.iter().map(|key| key.to_string()).collect();
        AppState::from_store(store.paths().clone(), ignored).expect("state")
    }

    #[test]
    fn extracts_source_selectors() {
        let params = RequestParams::from_pairs([
            ("slice_id", "7"),
            ("form_data_key", "abc"),
            ("form_data_key", "ignored"),
        ]);
        let parsed = command_parameters(&params).expect("parse");
        assert_eq!(parsed.slice_id, Some(7));
        assert_eq!(parsed.form_data_key.as_deref(), Some("abc"));
        assert_eq!(parsed.permalink_key, None);
    }

    #[test]
    fn non_numeric_slice_id_is_bad_request() {
        let params = RequestParams::from_pairs([("slice_id", "seven")]);
        let err = command_parameters(&params).expect_err("bad request");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn maps_error_classes_to_status() {
        let cases = [
            (
                ExploreError::PermalinkGetFailed { key: "k".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                ExploreError::not_found(EntityKind::Datasource, "3__table"),
                StatusCode::NOT_FOUND,
            ),
            (
                ExploreError::from(MalformedInput::DatasourceRef { value: "x".into() }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ExploreError::store("form data cache", anyhow::anyhow!("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::Explore(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn cache_miss_returns_slice_state() {
        let store = TestStore::new().expect("store");
        let state = app_state(&store);

        let Json(body) = get_explore(
            State(state),
            pairs(&[("form_data_key", "missing"), ("slice_id", "7"), ("standalone", "1")]),
        )
        .await
        .expect("explore");

        assert_eq!(body.result.message.as_deref(), Some(CACHE_MISS_MESSAGE));
        assert_eq!(body.result.form_data["viz_type"], "line");
        assert_eq!(body.result.form_data["url_params"]["standalone"], "1");
        assert_eq!(body.result.form_data["url_params"]["slice_id"], "7");
    }

    #[tokio::test]
    async fn missing_permalink_is_not_found() {
        let store = TestStore::new().expect("store");
        let state = app_state(&store);

        let err = get_explore(State(state), pairs(&[("permalink_key", "gone")]))
            .await
            .expect_err("not found");

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.message().contains("gone"));
    }
}
