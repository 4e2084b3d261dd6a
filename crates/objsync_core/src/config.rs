//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) yields [`EngineConfig::default`].
//!
//! ```toml
//! max_instances = 32
//!
//! [consumer]
//! thread_name = "objsync-sync"
//! idle_poll_ms = 20
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use objsync_shared::MAX_INSTANCES;
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};

/// Configuration for one engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of instance slots in the changed mask (1..=32).
    pub max_instances: u8,
    /// Consumer thread settings.
    pub consumer: ConsumerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_instances: MAX_INSTANCES,
            consumer: ConsumerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] on malformed TOML or out-of-range
    /// values.
    pub fn from_toml_str(text: &str) -> SyncResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SyncError::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if the file cannot be read or is
    /// invalid.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SyncError::InvalidConfig(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "engine config loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> SyncResult<()> {
        if !(1..=MAX_INSTANCES).contains(&self.max_instances) {
            return Err(SyncError::InvalidConfig(format!(
                "max_instances must be in 1..={MAX_INSTANCES}, got {}",
                self.max_instances
            )));
        }
        self.consumer.validate()
    }
}

/// Settings for [`crate::SyncWorker`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    /// Name of the consumer thread.
    pub thread_name: String,
    /// Longest the consumer sleeps without a doorbell before checking the
    /// changed mask anyway (ms).
    pub idle_poll_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            thread_name: "objsync-sync".to_string(),
            idle_poll_ms: 20,
        }
    }
}

impl ConsumerConfig {
    /// Idle poll interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> SyncResult<()> {
        if self.thread_name.trim().is_empty() {
            return Err(SyncError::InvalidConfig("consumer.thread_name must not be empty".to_string()));
        }
        if self.idle_poll_ms == 0 {
            return Err(SyncError::InvalidConfig("consumer.idle_poll_ms must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_instances, 32);
        assert_eq!(config.consumer.thread_name, "objsync-sync");
        assert_eq!(config.consumer.idle_poll(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str("max_instances = 4\n[consumer]\nidle_poll_ms = 5\n").unwrap();
        assert_eq!(config.max_instances, 4);
        assert_eq!(config.consumer.idle_poll_ms, 5);
        assert_eq!(config.consumer.thread_name, "objsync-sync");
    }

    #[test]
    fn test_sample_config_parses() {
        let config = EngineConfig::from_toml_str(include_str!("../../../config/engine.toml")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_instances() {
        for text in ["max_instances = 0", "max_instances = 33"] {
            assert!(matches!(EngineConfig::from_toml_str(text), Err(SyncError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_rejects_bad_consumer() {
        let zero_poll = "[consumer]\nidle_poll_ms = 0";
        let blank_name = "[consumer]\nthread_name = \"  \"";
        assert!(EngineConfig::from_toml_str(zero_poll).is_err());
        assert!(EngineConfig::from_toml_str(blank_name).is_err());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = EngineConfig::from_toml_str("max_instance = 4").unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/objsync/engine.toml").unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }
}
