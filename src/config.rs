//! Configuration for the constraint checker
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (constraint-check.toml)
//! - Environment variables (CONSTRAINTS__*)
//!
//! ## Example config file (constraint-check.toml):
//! ```toml
//! [schemas]
//! dir = "./schemas"
//! skip_prefixes = ["drafts/"]
//!
//! [declarations]
//! path = "./constraints.toml"
//!
//! [output]
//! format = "compact"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::loader::LoadConfig;

/// Main configuration for the constraint checker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub schemas: SchemasConfig,

    #[serde(default)]
    pub declarations: DeclarationsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where container schemas are loaded from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemasConfig {
    /// Directory holding one sub-directory per container
    #[serde(default = "default_schemas_dir")]
    pub dir: PathBuf,

    /// Relative path prefixes to skip while loading
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

/// Constraint declaration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationsConfig {
    #[serde(default = "default_declarations_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_schemas_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_skip_prefixes() -> Vec<String> {
    LoadConfig::default().skip_prefixes
}

fn default_declarations_path() -> PathBuf {
    PathBuf::from("constraints.toml")
}

impl Default for SchemasConfig {
    fn default() -> Self {
        Self {
            dir: default_schemas_dir(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl Default for DeclarationsConfig {
    fn default() -> Self {
        Self {
            path: default_declarations_path(),
        }
    }
}

impl CheckConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "constraint-check.toml",
            ".constraint-check.toml",
            "config/constraint-check.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "constraints", "constraint-check") {
            let xdg_config = config_dir.config_dir().join("constraint-check.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CONSTRAINTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Loader settings derived from the `[schemas]` section
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            skip_prefixes: self.schemas.skip_prefixes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CheckConfig::default();
        assert_eq!(config.schemas.dir, PathBuf::from("schemas"));
        assert_eq!(config.declarations.path, PathBuf::from("constraints.toml"));
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert!(config.load_config().skip_prefixes.contains(&".git/".to_string()));
    }

    #[test]
    fn test_serialize_config() {
        let mut config = CheckConfig::default();
        config.output.format = OutputFormat::Compact;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[schemas]"));
        assert!(toml_str.contains("format = \"compact\""));

        let parsed: CheckConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.output.format, OutputFormat::Compact);
        assert_eq!(parsed.schemas.skip_prefixes, config.schemas.skip_prefixes);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("check.toml");
        std::fs::write(
            &path,
            "[schemas]\ndir = \"fixtures/schemas\"\n\n[output]\nformat = \"compact\"\n",
        )
        .unwrap();

        let config = CheckConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.schemas.dir, PathBuf::from("fixtures/schemas"));
        assert_eq!(config.output.format, OutputFormat::Compact);
        // untouched sections keep their defaults
        assert_eq!(config.declarations.path, PathBuf::from("constraints.toml"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = CheckConfig::default();
        config.declarations.path = PathBuf::from("decl/constraints.toml");
        config.schemas.skip_prefixes = vec!["drafts/".to_string()];
        config.save(&path).unwrap();

        let loaded = CheckConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.declarations.path, PathBuf::from("decl/constraints.toml"));
        assert_eq!(loaded.load_config().skip_prefixes, vec!["drafts/"]);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(CheckConfig::load_from(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
