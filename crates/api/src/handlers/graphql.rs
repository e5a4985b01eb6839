use crate::{
    dto::{GraphQlPostBody, GraphQlQueryParams},
    state::AppState,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rdns_graphql_application::graphql::{ExecutionResult, QueryRequest};
use tracing::{error, instrument, warn};

#[instrument(skip_all, name = "api_graphql_get")]
pub async fn graphql_get(
    State(state): State<AppState>,
    Query(params): Query<GraphQlQueryParams>,
) -> Response {
    let result = state.execute_query.execute(params.into()).await;
    json_response(&result)
}

#[instrument(skip_all, name = "api_graphql_post")]
pub async fn graphql_post(State(state): State<AppState>, body: Bytes) -> Response {
    let body: GraphQlPostBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Failed to decode GraphQL request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let result = state.execute_query.execute(QueryRequest::from(body)).await;
    json_response(&result)
}

/// Query-level errors stay inside the body; the status is always 200.
fn json_response(result: &ExecutionResult) -> Response {
    match serde_json::to_vec(result) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode GraphQL response");
            StatusCode::OK.into_response()
        }
    }
}
