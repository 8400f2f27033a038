//! Client configuration.
//!
//! # Responsibility
//! - Define serde-backed settings for logging, engine policies and sync.
//! - Load settings from JSON text or a JSON file.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid configuration.
//! - Loading never panics; failures are reported as `ConfigError`.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// What happens to the tasks of a column that is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDeleteMode {
    /// Delete contained tasks in the same step.
    #[default]
    Cascade,
    /// Refuse to delete a column that still holds tasks.
    RejectNonEmpty,
}

/// How `task_moved` treats a target index past the end of the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveIndexPolicy {
    /// Clamp to the end of the destination sequence.
    #[default]
    Clamp,
    /// Reject with `EngineError::InvalidIndex`.
    Strict,
}

/// Consistency engine policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub column_delete_mode: ColumnDeleteMode,
    pub move_index_policy: MoveIndexPolicy,
}

/// Logging bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Remote sync queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// When false, local commits are never mirrored to the server.
    pub enabled: bool,
    /// Attempts per remote call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KanbanConfig {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub sync: SyncConfig,
}

impl KanbanConfig {
    /// Parses configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "sync.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors from configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnDeleteMode, ConfigError, KanbanConfig, MoveIndexPolicy};

    #[test]
    fn empty_object_yields_defaults() {
        let config = KanbanConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, KanbanConfig::default());
        assert_eq!(config.engine.column_delete_mode, ColumnDeleteMode::Cascade);
        assert_eq!(config.engine.move_index_policy, MoveIndexPolicy::Clamp);
        assert!(config.sync.enabled);
    }

    #[test]
    fn parses_snake_case_policies() {
        let config = KanbanConfig::from_json_str(
            r#"{"engine":{"column_delete_mode":"reject_non_empty","move_index_policy":"strict"}}"#,
        )
        .expect("policies should parse");
        assert_eq!(
            config.engine.column_delete_mode,
            ColumnDeleteMode::RejectNonEmpty
        );
        assert_eq!(config.engine.move_index_policy, MoveIndexPolicy::Strict);
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = KanbanConfig::from_json_str(r#"{"sync":{"max_attempts":0}}"#)
            .expect_err("zero attempts must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
