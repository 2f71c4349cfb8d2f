//! Host configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

use crate::core::error::ConfigError;
use crate::core::field::FieldFormat;

/// Per-plugin settings applied when the plugin is installed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDefaults {
    /// Attributes seeded into the config created on install
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Configuration of a plinth host
///
/// ```yaml
/// site_url: https://example.com
/// bind: 0.0.0.0:8080
/// plugins:
///   github:
///     attributes:
///       icon: /static/github.png
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Public base url, no trailing slash; OAuth callbacks are built from it
    pub site_url: String,

    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Plugin id to install-time defaults
    #[serde(default)]
    pub plugins: BTreeMap<String, PluginDefaults>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:3000".to_string(),
            bind: default_bind(),
            plugins: BTreeMap::new(),
        }
    }
}

impl HostConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("{}: {}", path.display(), e),
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the site url and listen address
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !FieldFormat::Url.matches(&self.site_url) {
            return Err(ConfigError::InvalidValue {
                field: "site_url".to_string(),
                value: self.site_url.clone(),
                message: "expected an http(s) url without trailing slash".to_string(),
            });
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|_| ConfigError::InvalidValue {
            field: "bind".to_string(),
            value: self.bind.clone(),
            message: "expected host:port".to_string(),
        })
    }

    /// Install-time attributes for `plugin_id`, empty when not configured
    pub fn defaults_for(&self, plugin_id: &str) -> BTreeMap<String, String> {
        self.plugins
            .get(plugin_id)
            .map(|defaults| defaults.attributes.clone())
            .unwrap_or_default()
    }
}
