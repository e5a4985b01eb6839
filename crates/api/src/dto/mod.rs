pub mod graphql;

pub use graphql::{GraphQlPostBody, GraphQlQueryParams};
