use async_trait::async_trait;
use rdns_graphql_domain::{DomainError, Hostname};

/// Reverse lookup of a single address. Implementations return the first name
/// the resolver reports, or an error when there is none.
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    async fn resolve_hostname(&self, ip: &str) -> Result<Hostname, DomainError>;
}
