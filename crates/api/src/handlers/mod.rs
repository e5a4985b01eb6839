pub mod graphql;

pub use graphql::{graphql_get, graphql_post};
