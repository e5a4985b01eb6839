mod hostname_schema;

pub use hostname_schema::{build_schema, HostnameArgs, HostnameFieldResolver};
