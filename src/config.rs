//! Player tuning loaded from TOML.
//!
//! Every field has a built-in default, so an empty file (or no file at all)
//! yields a working configuration. Values are validated once at load time;
//! the engine assumes a validated config afterwards.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::core::time::Time;

/// Errors raised while loading or validating a [`PlayerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tuning parameters for the playback engine and the audio thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Request another segment while fewer than this many are preloaded
    /// across the active store and every cached store.
    pub preload_threshold: usize,

    /// Video may lead audio by this much before the frame is held back.
    pub ahead_threshold_us: Time,

    /// Video may trail audio by this much before the frame is dropped.
    pub behind_threshold_us: Time,

    /// Upper bound on decoder reads per `update()` call.
    pub max_reads_per_update: usize,

    /// Sleep between audio-thread iterations that had nothing to do.
    pub audio_idle_sleep_ms: u64,

    /// Largest number of interleaved samples handed to the output per write.
    pub audio_write_chunk: usize,

    /// A video timestamp this far below the previous one is reported as a
    /// continuity anomaly.
    pub timestamp_regression_tolerance_us: Time,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            preload_threshold: 2,
            ahead_threshold_us: 10_000,
            behind_threshold_us: 40_000,
            max_reads_per_update: 32,
            audio_idle_sleep_ms: 2,
            audio_write_chunk: 4096,
            timestamp_regression_tolerance_us: 0,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PlayerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), ?config, "loaded player config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preload_threshold == 0 {
            return Err(ConfigError::Invalid(
                "preload_threshold must be at least 1".to_string(),
            ));
        }
        if self.max_reads_per_update == 0 {
            return Err(ConfigError::Invalid(
                "max_reads_per_update must be at least 1".to_string(),
            ));
        }
        if self.audio_write_chunk == 0 {
            return Err(ConfigError::Invalid(
                "audio_write_chunk must be at least 1".to_string(),
            ));
        }
        if self.ahead_threshold_us < 0 || self.behind_threshold_us < 0 {
            return Err(ConfigError::Invalid(
                "sync thresholds are magnitudes and must not be negative".to_string(),
            ));
        }
        if self.timestamp_regression_tolerance_us < 0 {
            return Err(ConfigError::Invalid(
                "timestamp_regression_tolerance_us must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn audio_idle_sleep(&self) -> Duration {
        Duration::from_millis(self.audio_idle_sleep_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.preload_threshold, 2);
        assert_eq!(config.ahead_threshold_us, 10_000);
        assert_eq!(config.behind_threshold_us, 40_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PlayerConfig::from_toml_str("").unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = PlayerConfig::from_toml_str("preload_threshold = 4\n").unwrap();
        assert_eq!(config.preload_threshold, 4);
        assert_eq!(config.behind_threshold_us, 40_000);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = PlayerConfig::from_toml_str("preload_threshold = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = PlayerConfig::from_toml_str("no_such_key = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_reads_per_update = 8").unwrap();
        writeln!(file, "audio_idle_sleep_ms = 5").unwrap();

        let config = PlayerConfig::load(file.path()).unwrap();
        assert_eq!(config.max_reads_per_update, 8);
        assert_eq!(config.audio_idle_sleep(), Duration::from_millis(5));
    }

    #[test]
    fn test_missing_file() {
        let err = PlayerConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
