use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use crate::graphql::{
    ArgumentDefinition, Arguments, FieldDefinition, FieldError, FieldResolver, ObjectType, Schema,
    SchemaError, TypeRef,
};
use crate::ports::HostnameResolver;

/// Arguments of `Query.hostname`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostnameArgs {
    pub ip: Option<String>,
}

impl HostnameArgs {
    /// A missing `ip`, or one that is not a string, yields `ip: None`.
    pub fn from_arguments(args: &Arguments) -> Self {
        Self {
            ip: args.get_str("ip").map(str::to_string),
        }
    }
}

/// Resolves `Query.hostname` through a [`HostnameResolver`].
pub struct HostnameFieldResolver {
    resolver: Arc<dyn HostnameResolver>,
}

impl HostnameFieldResolver {
    pub fn new(resolver: Arc<dyn HostnameResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl FieldResolver for HostnameFieldResolver {
    async fn resolve(&self, _parent: &JsonValue, args: &Arguments) -> Result<JsonValue, FieldError> {
        let Some(ip) = HostnameArgs::from_arguments(args).ip else {
            debug!("hostname requested without a string ip argument");
            return Ok(JsonValue::Null);
        };

        let hostname = self.resolver.resolve_hostname(&ip).await?;
        serde_json::to_value(hostname).map_err(|e| FieldError::new(e.to_string()))
    }
}

/// Builds the service schema:
///
/// ```graphql
/// type Hostname { name: String ip: String }
/// type Query { hostname(ip: String): Hostname }
/// ```
pub fn build_schema(resolver: Arc<dyn HostnameResolver>) -> Result<Schema, SchemaError> {
    let hostname = ObjectType::new("Hostname")
        .field(FieldDefinition::new("name", TypeRef::named("String")))
        .field(FieldDefinition::new("ip", TypeRef::named("String")));

    let query = ObjectType::new("Query").field(
        FieldDefinition::new("hostname", TypeRef::named("Hostname"))
            .argument(ArgumentDefinition::new("ip", TypeRef::named("String")))
            .resolver(Arc::new(HostnameFieldResolver::new(resolver))),
    );

    Schema::builder().object(hostname).query(query).finish()
}
