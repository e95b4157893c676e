//! Runtime configuration for embedding callers.
//!
//! # Responsibility
//! - Resolve the database path and logging settings from defaults and the
//!   `TASKFLOW_*` environment.
//! - Reject invalid logging settings before anything is opened.
//!
//! # Invariants
//! - `log_dir = None` means file logging stays disabled.

use crate::logging::{LogLevel, LoggingError};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TASKFLOW_DB";
pub const ENV_LOG_LEVEL: &str = "TASKFLOW_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKFLOW_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "taskflow.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// Level name accepted by [`LogLevel::parse`].
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: LogLevel::build_default().as_str().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by any non-empty `TASKFLOW_*` variable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoreConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            db_path: non_empty(ENV_DB_PATH).map_or(defaults.db_path, PathBuf::from),
            log_level: non_empty(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: non_empty(ENV_LOG_DIR).map(PathBuf::from).or(defaults.log_dir),
        }
    }

    /// Parses `log_level`.
    pub fn level(&self) -> Result<LogLevel, LoggingError> {
        LogLevel::parse(&self.log_level)
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        self.level()?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(LoggingError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use crate::logging::{LogLevel, LoggingError};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[]));
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.level().unwrap(), LogLevel::build_default());
    }

    #[test]
    fn environment_overrides_and_blank_values_are_ignored() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/tf.sqlite3"),
            (ENV_LOG_LEVEL, "  "),
            (ENV_LOG_DIR, "/var/log/taskflow"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/tf.sqlite3"));
        assert_eq!(config.log_level, CoreConfig::default().log_level);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/taskflow")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_level_and_relative_dir() {
        let bad_level = CoreConfig {
            log_level: "loud".to_string(),
            ..CoreConfig::default()
        };
        assert!(matches!(
            bad_level.validate(),
            Err(LoggingError::UnsupportedLevel(_))
        ));

        let relative = CoreConfig {
            log_dir: Some(PathBuf::from("logs")),
            ..CoreConfig::default()
        };
        assert!(matches!(
            relative.validate(),
            Err(LoggingError::RelativeLogDir(_))
        ));
    }
}
