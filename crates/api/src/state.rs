use rdns_graphql_application::use_cases::ExecuteQueryUseCase;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub execute_query: Arc<ExecuteQueryUseCase>,
}
