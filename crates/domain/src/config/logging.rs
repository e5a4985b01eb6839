use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Parsed level, or `None` when the configured name is not recognized.
    pub fn parsed_level(&self) -> Option<LogLevel> {
        self.level.parse().ok()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Verbosity names accepted on the command line and in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl LogLevel {
    /// Filter directive understood by the subscriber. `fatal` and `panic`
    /// collapse onto `error`, the most severe level tracing has.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "panic" => Ok(LogLevel::Panic),
            other => Err(format!("not a valid log level: {:?}", other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Panic => "panic",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_levels_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" panic ".parse::<LogLevel>(), Ok(LogLevel::Panic));
    }

    #[test]
    fn test_fatal_and_panic_map_to_error_directive() {
        assert_eq!(LogLevel::Fatal.as_directive(), "error");
        assert_eq!(LogLevel::Panic.as_directive(), "error");
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[test]
    fn test_unknown_level_is_not_parsed() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
        };
        assert_eq!(config.parsed_level(), None);
        assert_eq!(LoggingConfig::default().parsed_level(), Some(LogLevel::Info));
    }
}
