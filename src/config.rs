//! On-disk configuration
//!
//! A single TOML file with the device node to read from, the log level and
//! the acquisition loop settings. Every section is optional; a missing file
//! yields the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::controller::ControllerSettings;

const APP_DIR: &str = "dualshock";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Character device (or capture file) the reports are read from
    pub path: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/hidraw0"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
    pub controller: ControllerSettings,
}

impl Config {
    /// `$XDG_CONFIG_HOME/dualshock/config.toml` or the platform equivalent.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                info!("Loading configuration from {}", path.display());
                Self::parse(&content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        debug!("Parsed configuration: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() -> Result<(), ConfigError> {
        assert_eq!(Config::parse("")?, Config::default());
        Ok(())
    }

    #[test]
    fn partial_sections_keep_defaults() -> Result<(), ConfigError> {
        let config = Config::parse(
            r#"
            [device]
            path = "/dev/hidraw3"

            [controller]
            pacing_hz = 254
            "#,
        )?;
        assert_eq!(config.device.path, PathBuf::from("/dev/hidraw3"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.controller.pacing_hz, Some(254));
        assert_eq!(config.controller.queue_capacity, 2);
        assert_eq!(config.controller.retry_delay_ms, 4);
        Ok(())
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let result = Config::parse("[controller]\nqueue_capacity = \"two\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<(), ConfigError> {
        let path = std::env::temp_dir().join("dualshock-config-that-does-not-exist.toml");
        assert_eq!(Config::load(&path)?, Config::default());
        Ok(())
    }
}
