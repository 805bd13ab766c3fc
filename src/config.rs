//! Engine configuration

use crate::domain::value_objects::GaugeBounds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Gauge initialisation and clamping
    pub gauges: GaugeConfig,
    /// Illustration and music collaborators
    pub media: MediaConfig,
}

/// Gauge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GaugeConfig {
    /// Starting value of every selected gauge
    pub initial_value: i32,
    /// Lower clamp bound
    pub min: i32,
    /// Upper clamp bound
    pub max: i32,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            initial_value: 50,
            min: 0,
            max: 100,
        }
    }
}

impl GaugeConfig {
    pub fn bounds(&self) -> GaugeBounds {
        GaugeBounds::new(self.min, self.max)
    }
}

/// Media side-effect configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaConfig {
    /// Request node illustrations
    pub illustration_enabled: bool,
    /// Upper bound on a single illustration request (milliseconds)
    pub illustration_timeout_ms: u64,
    /// Look up mood music
    pub music_enabled: bool,
    /// Warm the music cache for the nodes reachable from the current one
    pub music_prefetch: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            illustration_enabled: true,
            illustration_timeout_ms: 15_000,
            music_enabled: true,
            music_prefetch: true,
        }
    }
}

impl MediaConfig {
    pub fn illustration_timeout(&self) -> Duration {
        Duration::from_millis(self.illustration_timeout_ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gauges = &self.gauges;
        if gauges.min > gauges.max {
            return Err(ConfigError::Invalid(format!(
                "gauges.min ({}) is greater than gauges.max ({})",
                gauges.min, gauges.max
            )));
        }
        if !(gauges.min..=gauges.max).contains(&gauges.initial_value) {
            return Err(ConfigError::Invalid(format!(
                "gauges.initialValue ({}) is outside {}..={}",
                gauges.initial_value, gauges.min, gauges.max
            )));
        }
        if self.media.illustration_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "media.illustrationTimeoutMs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.gauges.initial_value, 50);
        assert_eq!(config.gauges.bounds(), GaugeBounds::new(0, 100));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config =
            EngineConfig::from_json(r#"{"media": {"illustrationTimeoutMs": 250}}"#).unwrap();
        assert_eq!(config.media.illustration_timeout(), Duration::from_millis(250));
        assert!(config.media.music_prefetch);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let result = EngineConfig::from_json(r#"{"gauges": {"min": 80, "max": 20}}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn initial_value_must_lie_within_bounds() {
        let result = EngineConfig::from_json(r#"{"gauges": {"initialValue": 150}}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = EngineConfig::from_file("/definitely/not/here.json").await;
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
