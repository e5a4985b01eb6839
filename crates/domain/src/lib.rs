//! rdns-graphql domain layer
pub mod config;
pub mod errors;
pub mod hostname;

pub use config::{CliOverrides, Config, ConfigError, LogLevel, LoggingConfig, ServerConfig};
pub use errors::DomainError;
pub use hostname::Hostname;
