use rdns_graphql_domain::LoggingConfig;
use std::io::IsTerminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG`, when set, takes precedence
/// over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let level = config.parsed_level();
    let directive = level.unwrap_or_default().as_directive();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(ansi_enabled(
            std::io::stdout().is_terminal(),
            std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
        ))
        .init();

    if level.is_none() {
        warn!(level = %config.level, "Unknown log level, falling back to info");
    }

    info!("Logging initialized at level: {}", directive);
}

/// Colours only when writing to a terminal and `NO_COLOR` is unset.
fn ansi_enabled(stdout_is_terminal: bool, no_color: bool) -> bool {
    stdout_is_terminal && !no_color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_only_on_terminal() {
        assert!(ansi_enabled(true, false));
        assert!(!ansi_enabled(false, false));
    }

    #[test]
    fn test_no_color_disables_ansi() {
        assert!(!ansi_enabled(true, true));
        assert!(!ansi_enabled(false, true));
    }
}
