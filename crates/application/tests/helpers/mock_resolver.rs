#![allow(dead_code)]

use async_trait::async_trait;
use rdns_graphql_application::ports::HostnameResolver;
use rdns_graphql_domain::{DomainError, Hostname};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Answers from a fixed table; unknown addresses fail with
/// `DomainError::NoPtrRecords`.
#[derive(Clone, Default)]
pub struct MockHostnameResolver {
    names: Arc<RwLock<HashMap<String, Vec<String>>>>,
    errors: Arc<RwLock<HashMap<String, DomainError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockHostnameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(self, ip: &str, names: &[&str]) -> Self {
        self.names.write().unwrap().insert(
            ip.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub fn with_error(self, ip: &str, error: DomainError) -> Self {
        self.errors.write().unwrap().insert(ip.to_string(), error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostnameResolver for MockHostnameResolver {
    async fn resolve_hostname(&self, ip: &str) -> Result<Hostname, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.errors.read().unwrap().get(ip) {
            return Err(error.clone());
        }

        let names = self.names.read().unwrap().get(ip).cloned().unwrap_or_default();
        Hostname::from_ptr_names(ip, names)
    }
}
