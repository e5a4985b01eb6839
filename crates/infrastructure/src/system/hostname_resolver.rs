use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use rdns_graphql_application::ports::HostnameResolver;
use rdns_graphql_domain::{DomainError, Hostname};
use std::net::IpAddr;
use tracing::{debug, error, warn};

/// PTR lookups through the host's DNS configuration.
pub struct SystemHostnameResolver {
    resolver: TokioResolver,
}

impl SystemHostnameResolver {
    /// Reads the system resolver configuration (`/etc/resolv.conf` on Unix).
    /// Falls back to hickory's default upstreams when it cannot be read.
    pub fn new() -> Self {
        let builder = match TokioResolver::builder_tokio() {
            Ok(builder) => {
                debug!("Using system DNS configuration");
                builder
            }
            Err(e) => {
                warn!(error = %e, "Failed to read system DNS config, using defaults");
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }
        };

        Self::from_resolver(builder.build())
    }

    pub fn from_resolver(resolver: TokioResolver) -> Self {
        Self { resolver }
    }
}

impl Default for SystemHostnameResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostnameResolver for SystemHostnameResolver {
    async fn resolve_hostname(&self, ip: &str) -> Result<Hostname, DomainError> {
        let addr: IpAddr = match ip.parse() {
            Ok(addr) => addr,
            Err(_) => {
                let err = DomainError::InvalidIpAddress(ip.to_string());
                error!(ip = %ip, error = %err, "Reverse lookup failed");
                return Err(err);
            }
        };

        debug!(ip = %addr, "Performing PTR lookup");

        let lookup = match self.resolver.reverse_lookup(addr).await {
            Ok(lookup) => lookup,
            Err(e) => {
                let err = DomainError::LookupFailed {
                    ip: ip.to_string(),
                    reason: e.to_string(),
                };
                error!(ip = %ip, error = %err, "Reverse lookup failed");
                return Err(err);
            }
        };

        match Hostname::from_ptr_names(ip, lookup.iter().map(|ptr| ptr.to_utf8())) {
            Ok(hostname) => {
                debug!(
                    ip = %ip,
                    hostname = hostname.name.as_deref().unwrap_or_default(),
                    "PTR lookup successful"
                );
                Ok(hostname)
            }
            Err(err) => {
                error!(ip = %ip, error = %err, "Reverse lookup failed");
                Err(err)
            }
        }
    }
}
