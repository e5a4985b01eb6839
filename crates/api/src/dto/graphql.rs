use rdns_graphql_application::graphql::QueryRequest;
use serde::Deserialize;
use serde_json::{Map, Value};

/// `GET /graphql?query=...`. Operation names and variables are not read
/// from the query string.
#[derive(Deserialize, Debug, Default)]
pub struct GraphQlQueryParams {
    #[serde(default)]
    pub query: String,
}

impl From<GraphQlQueryParams> for QueryRequest {
    fn from(params: GraphQlQueryParams) -> Self {
        QueryRequest::new(params.query)
    }
}

/// `POST /graphql` body. `operationName` is accepted as an alias of
/// `operation`.
#[derive(Deserialize, Debug, Default)]
pub struct GraphQlPostBody {
    #[serde(default)]
    pub query: String,
    #[serde(default, alias = "operationName")]
    pub operation: Option<String>,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
}

impl From<GraphQlPostBody> for QueryRequest {
    fn from(body: GraphQlPostBody) -> Self {
        QueryRequest::new(body.query)
            .with_operation_name(body.operation)
            .with_variables(body.variables)
    }
}
