use serde_json::{Map as JsonMap, Value as JsonValue};

/// One inbound GraphQL request, independent of the transport that carried it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Option<JsonMap<String, JsonValue>>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// An empty name is treated as no name at all.
    pub fn with_operation_name(mut self, operation_name: Option<String>) -> Self {
        self.operation_name = operation_name.filter(|name| !name.is_empty());
        self
    }

    pub fn with_variables(mut self, variables: Option<JsonMap<String, JsonValue>>) -> Self {
        self.variables = variables;
        self
    }
}
