use serde::{Deserialize, Serialize};

use crate::DomainError;

/// A reverse-DNS answer for a single address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hostname {
    pub ip: String,
    pub name: Option<String>,
}

impl Hostname {
    pub fn new(ip: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            name: Some(name.into()),
        }
    }

    /// Picks the first PTR name in the order the lookup facility returned them.
    pub fn from_ptr_names<I, S>(ip: &str, names: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .next()
            .map(|name| Self::new(ip, name))
            .ok_or_else(|| DomainError::NoPtrRecords(ip.to_string()))
    }
}
