use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::HostTypes;
use crate::manager::{ArchiveErrorPolicy, LoaderOptions};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Plugin directory used when none is given on the command line
    #[serde(default = "default_plugin_dir")]
    pub directory: PathBuf,

    /// Abort or skip when an archive cannot be read
    #[serde(default)]
    pub archive_errors: ArchiveErrorPolicy,

    /// Open every archive while loading
    #[serde(default)]
    pub verify_archives: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Include the standard runtime base types
    #[serde(default = "default_true")]
    pub standard_types: bool,

    /// Additional host base types
    #[serde(default)]
    pub types: Vec<HostTypeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostTypeConfig {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_plugin_dir() -> PathBuf {
    PathBuf::from("./plugins")
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_dir(),
            archive_errors: ArchiveErrorPolicy::default(),
            verify_archives: false,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            standard_types: true,
            types: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get default configuration path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;

        Ok(home.join(".plugjar").join("config.yaml"))
    }

    /// Loader options from the `plugins` section
    #[must_use]
    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            archive_errors: self.plugins.archive_errors,
            verify_archives: self.plugins.verify_archives,
        }
    }

    /// Host base types from the `host` section
    #[must_use]
    pub fn host_types(&self) -> HostTypes {
        let base = if self.host.standard_types {
            HostTypes::standard()
        } else {
            HostTypes::empty()
        };

        self.host
            .types
            .iter()
            .fold(base, |host, t| host.with_type(&t.name, t.extends.as_deref()))
    }
}
