use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("lookup {ip}: {reason}")]
    LookupFailed { ip: String, reason: String },

    #[error("lookup {0}: no PTR records found")]
    NoPtrRecords(String),
}
