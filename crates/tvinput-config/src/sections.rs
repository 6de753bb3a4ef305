//! Configuration sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tvinput_hal::ApiVersion;

use crate::ConfigError;

/// Which module and device to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    /// Module id to look up
    pub module_id: String,
    /// Device name passed to the module
    pub device_name: String,
    /// Newest device API version this consumer drives, as "major.minor"
    pub supported_version: String,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            module_id: "tv_input".to_string(),
            device_name: "default".to_string(),
            supported_version: "0.1".to_string(),
        }
    }
}

impl HalConfig {
    /// Parsed `supported_version`
    pub fn supported_version(&self) -> Result<ApiVersion, ConfigError> {
        self.supported_version.parse::<ApiVersion>().map_err(|e| {
            ConfigError::Invalid(format!("hal.supported_version: {e}"))
        })
    }
}

/// Simulated hardware used when no vendor module is registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Named mock profile
    pub profile: String,
    /// Hardware description file, takes precedence over `profile`
    pub description: Option<PathBuf>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            profile: "hdmi_ports".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: false,
        }
    }
}

pub(crate) const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
