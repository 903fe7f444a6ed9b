//! Engine configuration
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (branded.toml)
//! - Environment variables (BRANDED__*)
//!
//! ## Example config file (branded.toml):
//! ```toml
//! [registry]
//! default_version = 1
//! version_separator = "__v"
//!
//! [migration]
//! infer_target_schema = true
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Main configuration for the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Registry and factory settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Migration settings
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Version given to definitions that do not ask for one
    #[serde(default = "default_version")]
    pub default_version: u32,

    /// Joins a lineage id and a version into a version definition id
    #[serde(default = "default_version_separator")]
    pub version_separator: String,
}

/// Migration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Infer and register a target schema from migrated data when no
    /// definition exists for the target version. When off, such a migration
    /// fails instead.
    #[serde(default = "default_true")]
    pub infer_target_schema: bool,
}

fn default_version() -> u32 {
    1
}

fn default_version_separator() -> String {
    "__v".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_version: default_version(),
            version_separator: default_version_separator(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            infer_target_schema: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["branded.toml", ".branded.toml", "config/branded.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "branded-schemas") {
            let xdg_config = config_dir.config_dir().join("branded.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // BRANDED__REGISTRY__DEFAULT_VERSION=2
        builder = builder.add_source(
            Environment::with_prefix("BRANDED")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.registry.default_version, 1);
        assert_eq!(config.registry.version_separator, "__v");
        assert!(config.migration.infer_target_schema);
    }

    #[test]
    fn test_serialize_config() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[migration]"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str("[migration]\ninfer_target_schema = false\n").unwrap();
        assert!(!config.migration.infer_target_schema);
        assert_eq!(config.registry, RegistryConfig::default());
    }
}
