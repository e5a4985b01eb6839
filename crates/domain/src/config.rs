pub mod errors;
pub mod logging;
pub mod root;
pub mod server;

pub use errors::ConfigError;
pub use logging::{LogLevel, LoggingConfig};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
