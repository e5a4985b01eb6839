use std::sync::Arc;
use tracing::{debug, warn};

use crate::graphql::{execute, ExecutionResult, QueryRequest, Schema};

/// Runs GraphQL requests against the shared, immutable schema.
pub struct ExecuteQueryUseCase {
    schema: Arc<Schema>,
}

impl ExecuteQueryUseCase {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    pub async fn execute(&self, request: QueryRequest) -> ExecutionResult {
        debug!(
            query = %request.query,
            operation = request.operation_name.as_deref().unwrap_or(""),
            "Executing query"
        );

        let result = execute(&self.schema, &request).await;

        if !result.is_ok() {
            let messages: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
            warn!(
                errors = result.errors.len(),
                messages = ?messages,
                "Query completed with errors"
            );
        }

        result
    }
}
