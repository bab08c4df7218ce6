//! Sync configuration, loaded once from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Runtime settings for the store and the sync service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Journal file; `None` keeps everything in memory.
    pub journal_path: Option<PathBuf>,
    /// Compact the journal after this many appended records.
    pub checkpoint_every: u32,
    /// Bound of the store event channel.
    pub event_capacity: usize,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            journal_path: None,
            checkpoint_every: 256,
            event_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl SyncConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise see
    /// [`SyncConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        if self.checkpoint_every == 0 {
            return Err(ConfigError::Invalid(
                "checkpoint_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.checkpoint_every, 256);
        assert_eq!(config.event_capacity, 1024);
        assert!(config.journal_path.is_none());
    }

    #[test]
    fn test_partial_override() {
        let config = SyncConfig::from_toml_str(
            r#"
            journal_path = "/tmp/town.ftj"
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.journal_path, Some(PathBuf::from("/tmp/town.ftj")));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.checkpoint_every, 256);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = SyncConfig::from_toml_str("event_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SyncConfig::from_toml_str("checkpoint_every = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = SyncConfig::from_toml_str("event_capacity = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, "checkpoint_every = 8\n").unwrap();
        assert_eq!(SyncConfig::load(&path).unwrap().checkpoint_every, 8);

        let missing = SyncConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
