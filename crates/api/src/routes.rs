use crate::handlers;
use crate::middleware::log_request;
use crate::state::AppState;
use axum::{middleware, routing::get, Router};

pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/graphql",
            get(handlers::graphql_get).post(handlers::graphql_post),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
