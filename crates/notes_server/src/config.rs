//! Server configuration.
//!
//! Defaults can be overridden by a JSON object in the `CONFIG` environment
//! variable. Keys missing from the object keep their default value.

use notes_core::LogOptions;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

pub const CONFIG_ENV: &str = "CONFIG";

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DSN: &str = "notes.db";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address, `host:port`.
    pub addr: String,
    /// Store location: a file path or `:memory:`.
    pub dsn: String,
    /// `log_level` and `log_dir`, read from the same object.
    #[serde(flatten)]
    pub log: LogOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            dsn: DEFAULT_DSN.to_string(),
            log: LogOptions::default(),
        }
    }
}

impl Config {
    /// Reads the configuration from the `CONFIG` environment variable.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when the variable is set but is not a
    /// valid configuration object.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_json(std::env::var(CONFIG_ENV).ok().as_deref())
    }

    fn from_json(raw: Option<&str>) -> Result<Self, ConfigError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(json) => serde_json::from_str(json).map_err(ConfigError::Invalid),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid {CONFIG_ENV} value: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};
    use notes_core::LogOptions;
    use std::path::Path;

    #[test]
    fn unset_or_blank_variable_yields_defaults() {
        let defaults = Config::default();
        assert_eq!(defaults.addr, "127.0.0.1:8080");
        assert_eq!(defaults.dsn, "notes.db");
        assert_eq!(defaults.log, LogOptions::default());

        assert_eq!(Config::from_json(None).unwrap(), defaults);
        assert_eq!(Config::from_json(Some("  ")).unwrap(), defaults);
    }

    #[test]
    fn partial_object_overrides_only_given_keys() {
        let config = Config::from_json(Some(
            r#"{"addr": "0.0.0.0:9000", "log_dir": "/var/log/notes"}"#,
        ))
        .unwrap();

        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.log.log_dir.as_deref(), Some(Path::new("/var/log/notes")));
        assert_eq!(config.log.log_level, LogOptions::default().log_level);
        assert_eq!(config.dsn, "notes.db");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::from_json(Some(r#"{"dsn": ":memory:", "colour": "blue"}"#)).unwrap();
        assert_eq!(config.dsn, ":memory:");
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = Config::from_json(Some("{addr: nope")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().starts_with("invalid CONFIG value"));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        assert!(Config::from_json(Some(r#"{"addr": 8080}"#)).is_err());
    }
}
