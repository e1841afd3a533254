//! Configuration management for luxd
//!
//! TOML-based configuration: user config first, then the system config,
//! then built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/luxd";
pub const USER_CONFIG_DIR: &str = ".config/luxd";

fn default_step() -> f64 {
    0.05
}

fn default_state_path() -> PathBuf {
    PathBuf::from("/var/lib/luxd/brightness.json")
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuxConfig {
    /// Brightness change per hotkey press.
    #[serde(default = "default_step")]
    pub step: f64,

    /// When set, hotkey events without a target apply to every display
    /// instead of the first one.
    #[serde(default)]
    pub link_displays: bool,

    /// Location of the persisted brightness state file.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for LuxConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            link_displays: false,
            state_path: default_state_path(),
        }
    }
}

impl LuxConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Try user config first, then system config
        if let Ok(home) = std::env::var("HOME") {
            let user_config = Path::new(&home).join(USER_CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let system_config = Path::new(CONFIG_DIR).join("config.toml");
        if system_config.exists() {
            return Self::load(&system_config);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LuxConfig::default();
        assert!((config.step - 0.05).abs() < 1e-9);
        assert!(!config.link_displays);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = LuxConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LuxConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.step, parsed.step);
        assert_eq!(config.link_displays, parsed.link_displays);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
step = 0.1
link_displays = true
state_path = "/tmp/luxd-state.json"
"#;
        write!(temp_file, "{}", config_content).unwrap();

        let config = LuxConfig::load(temp_file.path()).unwrap();
        assert!((config.step - 0.1).abs() < 1e-9);
        assert!(config.link_displays);
        assert_eq!(config.state_path, PathBuf::from("/tmp/luxd-state.json"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "link_displays = true").unwrap();

        let config = LuxConfig::load(temp_file.path()).unwrap();
        assert!(config.link_displays);
        assert!((config.step - 0.05).abs() < 1e-9);
        assert_eq!(config.state_path, default_state_path());
    }

    #[test]
    fn test_save_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = LuxConfig {
            step: 0.02,
            ..Default::default()
        };

        config.save(temp_file.path()).unwrap();

        let loaded = LuxConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.step, loaded.step);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "step = [not valid").unwrap();

        assert!(matches!(
            LuxConfig::load(temp_file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
