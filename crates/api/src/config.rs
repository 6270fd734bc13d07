//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid PORT value: {0}")]
    InvalidPort(String),

    #[error("Invalid LOG_FORMAT value: {0} (expected \"text\" or \"json\")")]
    InvalidLogFormat(String),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `WES_TEMPLATE_CATALOG`: path to a JSON template catalog; the built-in
///   catalog is used when unset
/// - `DATABASE_URL`: PostgreSQL connection string; routes are kept in memory
///   when unset
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub template_catalog: Option<PathBuf>,
    pub database_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through a variable lookup function.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::InvalidPort(p))?,
            None => defaults.port,
        };
        let log_format = match var("LOG_FORMAT") {
            Some(f) => f.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            template_catalog: var("WES_TEMPLATE_CATALOG").map(PathBuf::from),
            database_url: var("DATABASE_URL"),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            template_catalog: None,
            database_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.template_catalog.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_reads_all_variables() {
        let config = from_vars(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("RUST_LOG", "routing=debug"),
            ("LOG_FORMAT", "JSON"),
            ("WES_TEMPLATE_CATALOG", "/etc/wes/templates.json"),
            ("DATABASE_URL", "postgres://localhost/wes"),
        ])
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "routing=debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.template_catalog,
            Some(PathBuf::from("/etc/wes/templates.json"))
        );
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/wes")
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = from_vars(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(matches!(
            from_vars(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            from_vars(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }
}
