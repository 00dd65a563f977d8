use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::builders::classifier::Classifier;
use crate::builders::validator::{ConfigValidator, StandardValidator};

pub const CONFIG_VERSION: &str = "1.0";
pub const DEFAULT_CONFIG_FILE: &str = "recipe-harvester.toml";

/// Settings that drive the tree walk and the structural matcher.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScanSettings {
    /// Extension of candidate source files, without the leading dot.
    pub source_extension: String,
    /// Directory names that are never descended into.
    pub excluded_dirs: Vec<String>,
    /// Skip directories whose name starts with a dot.
    pub skip_hidden: bool,
    /// Superclass names that mark a class as a recipe.
    pub markers: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            source_extension: "java".to_string(),
            excluded_dirs: vec!["build".to_string(), "target".to_string()],
            skip_hidden: true,
            markers: vec!["Recipe".to_string(), "ScanningRecipe".to_string()],
        }
    }
}

/// A named source root. The name becomes the repository tag of every record
/// extracted below `path`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RepositorySource {
    pub name: String,
    pub path: PathBuf,
}

impl RepositorySource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parses the `NAME=PATH` form accepted on the command line.
    pub fn parse_assignment(assignment: &str) -> Result<Self> {
        let (name, path) = assignment
            .split_once('=')
            .with_context(|| format!("Repository must be given as NAME=PATH, got '{assignment}'"))?;
        if name.trim().is_empty() || path.trim().is_empty() {
            anyhow::bail!("Repository name and path cannot be empty: '{assignment}'");
        }
        Ok(Self::new(name.trim(), path.trim()))
    }
}

/// Fixed descriptive fields written into the dataset document header.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DatasetSettings {
    pub source_format: String,
    pub description: String,
    /// Pins the extraction date (`YYYY-MM-DD`). Today's date is used when unset.
    pub extraction_date: Option<String>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            source_format: "OpenRewrite Recipe Collection".to_string(),
            description:
                "Comprehensive collection of OpenRewrite recipes for Java code transformation and repair"
                    .to_string(),
            extraction_date: None,
        }
    }
}

impl DatasetSettings {
    pub fn resolved_extraction_date(&self) -> String {
        self.extraction_date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    pub version: String,
    pub scan: ScanSettings,
    pub dataset: DatasetSettings,
    pub classifier: Classifier,
    pub repositories: Vec<RepositorySource>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            scan: ScanSettings::default(),
            dataset: DatasetSettings::default(),
            classifier: Classifier::standard(),
            repositories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<ExtractorConfig>;
    fn save_config(&self, config: &ExtractorConfig) -> Result<()>;
    fn get_config_path(&self) -> Result<PathBuf>;
}

pub struct ConfigManager {
    config_path: PathBuf,
    format: ConfigFormat,
}

impl ConfigManager {
    /// Uses `recipe-harvester.toml` in the current directory.
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to read current directory")?;
        Ok(Self::new_at(current_dir.join(DEFAULT_CONFIG_FILE)))
    }

    pub fn new_at(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let format = ConfigFormat::from_path(&config_path);
        Self {
            config_path,
            format,
        }
    }

    /// Writes the default configuration unless a file is already present.
    pub fn initialize(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }

        let default_config = ExtractorConfig::default();
        self.save_config(&default_config)?;
        info!(path = %self.config_path.display(), "Wrote default configuration");
        Ok(true)
    }

    /// Runs the standard validator and returns every issue found.
    pub fn validate_config(&self) -> Result<Vec<String>> {
        let config = self.load_config()?;
        let validator = StandardValidator::new();
        validator.validate_config(&config)
    }
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<ExtractorConfig> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(ExtractorConfig::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        match self.format {
            ConfigFormat::Toml => toml::from_str(&content).context("Failed to parse config file"),
            ConfigFormat::Yaml => {
                serde_yaml::from_str(&content).context("Failed to parse config file")
            }
        }
    }

    fn save_config(&self, config: &ExtractorConfig) -> Result<()> {
        let content = match self.format {
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).context("Failed to serialize config")?
            }
            ConfigFormat::Yaml => {
                serde_yaml::to_string(config).context("Failed to serialize config")?
            }
        };

        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        Ok(self.config_path.clone())
    }
}
