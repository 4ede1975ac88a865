//! Configuration file handling for saving and loading adaptor settings.
//!
//! Settings are plain JSON. Every field is optional so a config file only
//! needs to name what it changes; command-line flags take precedence over
//! anything loaded here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::converter::Converter;
use crate::registry::Registry;
use crate::types::Platform;

/// Adaptor settings that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptorConfig {
    /// Platform used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// External registry file replacing the built-in module table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<PathBuf>,

    /// Pretty-print generated documents
    #[serde(default)]
    pub pretty: bool,
}

impl AdaptorConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        debug!(path = ?path.as_ref(), "loaded configuration");
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(registry) = &self.registry {
            if registry.as_os_str().is_empty() {
                anyhow::bail!("Registry path must not be empty");
            }
            if !registry.is_file() {
                anyhow::bail!("Registry file {:?} does not exist", registry);
            }
        }
        Ok(())
    }

    /// Build a converter over the configured registry, or the built-in one
    pub fn load_converter(&self) -> Result<Converter> {
        match &self.registry {
            Some(path) => {
                let registry = Registry::from_file(path)
                    .with_context(|| format!("Failed to load registry from {:?}", path))?;
                Converter::new(registry)
                    .with_context(|| format!("Registry {:?} is not valid", path))
            }
            None => Ok(Converter::builtin()),
        }
    }
}
