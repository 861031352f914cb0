//! Logging configuration.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format name; anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Line format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Append-mode log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Environment variable selecting the format.
    pub const FORMAT_ENV: &'static str = "ERRFIX_LOG_FORMAT";

    /// Environment variable naming the log file.
    pub const FILE_ENV: &'static str = "ERRFIX_LOG_FILE";

    /// Builds logging configuration from the environment.
    ///
    /// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug`
    /// when `verbose` is requested.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_lookup(verbose, |key| std::env::var(key).ok())
    }

    /// Builds logging configuration from `lookup`.
    #[must_use]
    pub fn from_lookup<F>(verbose: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_level = if verbose { "debug" } else { "info" };
        let filter = lookup(EnvFilter::DEFAULT_ENV)
            .filter(|v| !v.trim().is_empty())
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(default_level));

        let format = lookup(Self::FORMAT_ENV)
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        let file = lookup(Self::FILE_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            format,
            filter,
            file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(false, |_| None);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file.is_none());
        assert_eq!(config.filter.to_string(), "info");
    }

    #[test]
    fn test_verbose_raises_level() {
        let config = LoggingConfig::from_lookup(true, |_| None);
        assert_eq!(config.filter.to_string(), "debug");
    }

    #[test]
    fn test_env_values() {
        let config = LoggingConfig::from_lookup(true, |key| match key {
            "RUST_LOG" => Some("errfix=trace".to_string()),
            "ERRFIX_LOG_FORMAT" => Some("JSON".to_string()),
            "ERRFIX_LOG_FILE" => Some("/tmp/errfix.log".to_string()),
            _ => None,
        });
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/errfix.log")));
        assert_eq!(config.filter.to_string(), "errfix=trace");
    }
}
