//! Configuration for the DevCare agent.

use crate::collector::CollectorConfig;
use crate::core::breaks::DEFAULT_BREAK_INTERVAL_MINUTES;
use crate::core::posture::{PostureConfig, CALIBRATION_FRAMES, SMOOTHING_WINDOW, STALE_AFTER_SECS};
use crate::core::windowing::DEFAULT_WINDOW_SECS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default port for the local HTTP transport.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Main configuration for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minutes of work before a break is suggested
    pub break_interval_minutes: i64,

    /// How often the state snapshot is republished
    #[serde(with = "duration_serde")]
    pub publish_interval: Duration,

    /// Seconds without a pose frame before posture reads as 0
    pub stale_frame_secs: u64,

    /// Frames sampled to learn the upright baseline
    pub calibration_frames: usize,

    /// Number of scores averaged into the reported posture score
    pub smoothing_window: usize,

    /// Trailing window for typing speed
    pub typing_window_secs: u64,

    /// Port for the local HTTP transport
    pub server_port: u16,

    /// Whether to install the system key hook
    pub capture_keyboard: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            break_interval_minutes: DEFAULT_BREAK_INTERVAL_MINUTES,
            publish_interval: Duration::from_secs(1),
            stale_frame_secs: STALE_AFTER_SECS as u64,
            calibration_frames: CALIBRATION_FRAMES,
            smoothing_window: SMOOTHING_WINDOW,
            typing_window_secs: DEFAULT_WINDOW_SECS as u64,
            server_port: DEFAULT_SERVER_PORT,
            capture_keyboard: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("devcare-agent")
            .join("config.json")
    }

    /// Reject values the engines cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.break_interval_minutes <= 0 {
            return Err(ConfigError::Invalid(format!(
                "break_interval_minutes must be positive, got {}",
                self.break_interval_minutes
            )));
        }
        if self.publish_interval < Duration::from_secs(1) {
            return Err(ConfigError::Invalid(
                "publish_interval must be at least one second".to_string(),
            ));
        }
        if self.calibration_frames == 0 {
            return Err(ConfigError::Invalid(
                "calibration_frames must be positive".to_string(),
            ));
        }
        if self.smoothing_window == 0 {
            return Err(ConfigError::Invalid(
                "smoothing_window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn posture_config(&self) -> PostureConfig {
        PostureConfig {
            calibration_frames: self.calibration_frames,
            smoothing_window: self.smoothing_window,
            stale_after: chrono::Duration::seconds(self.stale_frame_secs as i64),
        }
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            capture_keyboard: self.capture_keyboard,
            ..CollectorConfig::default()
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("devcare-config-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.break_interval_minutes, 45);
        assert_eq!(config.publish_interval, Duration::from_secs(1));
        assert_eq!(config.calibration_frames, 90);
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.server_port, 5000);
        assert!(config.capture_keyboard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let cases = [
            Config {
                break_interval_minutes: 0,
                ..Config::default()
            },
            Config {
                publish_interval: Duration::ZERO,
                ..Config::default()
            },
            Config {
                publish_interval: Duration::from_millis(500),
                ..Config::default()
            },
            Config {
                calibration_frames: 0,
                ..Config::default()
            },
            Config {
                smoothing_window: 0,
                ..Config::default()
            },
        ];

        for config in cases {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("config.json");
        let config = Config {
            break_interval_minutes: 30,
            server_port: 5050,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"publish_interval\": 1"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loaded = Config::load_from(&temp_path("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"break_interval_minutes": 20}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.break_interval_minutes, 20);
        assert_eq!(loaded.smoothing_window, SMOOTHING_WINDOW);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_posture_config_mapping() {
        let config = Config {
            calibration_frames: 30,
            stale_frame_secs: 10,
            ..Config::default()
        };
        let posture = config.posture_config();
        assert_eq!(posture.calibration_frames, 30);
        assert_eq!(posture.stale_after, chrono::Duration::seconds(10));
    }
}
