//! Configuration management for the TV input HAL tools
//!
//! TOML configuration files, optionally overridden from `TVINPUT_*`
//! environment variables (`__` separates nested keys, e.g.
//! `TVINPUT_HAL__DEVICE_NAME`).

mod sections;

pub use sections::{HalConfig, LoggingConfig, MockConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Layered configuration error: {0}")]
    Layered(#[from] config::ConfigError),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/tvinput";
pub const USER_CONFIG_DIR: &str = "/data/tvinput";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "TVINPUT";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvInputConfig {
    #[serde(default)]
    pub hal: HalConfig,

    #[serde(default)]
    pub mock: MockConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TvInputConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// First existing file among the standard locations, user config first
    pub fn default_path() -> Option<PathBuf> {
        [USER_CONFIG_DIR, CONFIG_DIR]
            .iter()
            .map(|dir| Path::new(dir).join("config.toml"))
            .find(|path| path.exists())
    }

    /// Load an optional file, then apply `TVINPUT_*` environment overrides
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Toml)
                    .required(true),
            );
        } else {
            tracing::warn!("No configuration file found, using defaults");
        }

        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hal.module_id.trim().is_empty() {
            return Err(ConfigError::Invalid("hal.module_id is empty".into()));
        }
        if self.hal.device_name.trim().is_empty() {
            return Err(ConfigError::Invalid("hal.device_name is empty".into()));
        }
        self.hal.supported_version()?;

        if self.mock.description.is_none() && self.mock.profile.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "mock.profile is empty and no mock.description is set".into(),
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !sections::LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                sections::LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// `TVINPUT_*` variables, `__` between nested keys
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = TvInputConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hal.module_id, "tv_input");
        assert!(!config.logging.ansi);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = TvInputConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: TvInputConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/tvinput/config.toml"));
        assert!(format!("{}", err).contains("not found"));

        let err = ConfigError::Invalid("test error".to_string());
        assert!(format!("{}", err).contains("Invalid"));
    }

    #[test]
    fn test_load_config_from_file() {
        let file = toml_file(
            r#"
[hal]
device_name = "default"
supported_version = "0.1"

[mock]
profile = "tuner_box"

[logging]
level = "debug"
"#,
        );

        let config = TvInputConfig::load(file.path()).unwrap();
        assert_eq!(config.mock.profile, "tuner_box");
        assert_eq!(config.logging.level, "debug");
        // Missing keys fall back to defaults
        assert_eq!(config.hal.module_id, "tv_input");
    }

    #[test]
    fn test_load_missing_file() {
        let result = TvInputConfig::load(Path::new("/nonexistent/tvinput.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let file = toml_file(
            r#"
[logging]
level = "loud"
"#,
        );
        assert!(matches!(
            TvInputConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let file = toml_file(
            r#"
[hal]
module_id = ""
"#,
        );
        assert!(TvInputConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_save_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = TvInputConfig::default();
        config.mock.description = Some(PathBuf::from("/etc/tvinput/hardware.toml"));

        config.save(&path).unwrap();

        let loaded = TvInputConfig::load(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_layered_file() {
        let file = toml_file(
            r#"
[hal]
device_name = "default"

[mock]
profile = "passthrough"
"#,
        );

        let config = TvInputConfig::load_layered(Some(file.path())).unwrap();
        assert_eq!(config.mock.profile, "passthrough");
        assert_eq!(config.hal.supported_version, "0.1");
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file(
            r#"
[logging]
level = "warn"

[mock]
profile = "passthrough"
"#,
        );
        let config = TvInputConfig::load_with_env(
            Some(file.path()),
            env(&[
                ("TVINPUT_LOGGING__LEVEL", "trace"),
                ("TVINPUT_HAL__DEVICE_NAME", "secondary"),
                ("OTHER_LOGGING__LEVEL", "off"),
            ]),
        )
        .unwrap();

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.hal.device_name, "secondary");
        assert_eq!(config.mock.profile, "passthrough");
    }

    #[test]
    fn test_env_only_without_file() {
        let config =
            TvInputConfig::load_with_env(None, env(&[("TVINPUT_MOCK__PROFILE", "empty")]))
                .unwrap();
        assert_eq!(config.mock.profile, "empty");
        assert_eq!(config.hal, HalConfig::default());
    }

    #[test]
    fn test_env_override_is_validated() {
        let result = TvInputConfig::load_with_env(
            None,
            env(&[("TVINPUT_HAL__SUPPORTED_VERSION", "latest")]),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_layered_missing_file() {
        let result = TvInputConfig::load_layered(Some(Path::new("/nonexistent/tvinput.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_constants() {
        assert_eq!(CONFIG_DIR, "/etc/tvinput");
        assert_eq!(ENV_PREFIX, "TVINPUT");
    }
}
