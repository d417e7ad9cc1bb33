//! TOML configuration file loading
//!
//! Supports `~/.config/describe-bot/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BotConfigFile {
    /// Vision service settings
    #[serde(default)]
    pub vision: VisionFileConfig,

    /// Bot Framework app registration
    #[serde(default)]
    pub bot: BotFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Turn processing limits
    #[serde(default)]
    pub pipeline: PipelineFileConfig,
}

/// Vision service configuration
#[derive(Debug, Default, Deserialize)]
pub struct VisionFileConfig {
    pub api_key: Option<String>,
    /// Base URL, e.g. `https://westeurope.api.cognitive.microsoft.com/vision/v2.0`
    pub endpoint: Option<String>,
}

/// Bot Framework credentials
#[derive(Debug, Default, Deserialize)]
pub struct BotFileConfig {
    pub app_id: Option<String>,
    pub app_password: Option<String>,
    pub tenant: Option<String>,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// HTTP port
    pub port: Option<u16>,
}

/// Pipeline limits
#[derive(Debug, Default, Deserialize)]
pub struct PipelineFileConfig {
    /// Per remote call timeout in seconds
    pub call_timeout_secs: Option<u64>,
    /// Largest accepted image in bytes
    pub max_image_bytes: Option<usize>,
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. Without one the standard path is
/// tried, and a missing or broken file there falls back to defaults.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<BotConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(BotConfigFile::default());
    };

    if !path.exists() {
        return Ok(BotConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(BotConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(BotConfigFile::default())
        }
    }
}

/// Return the config file path: `~/.config/describe-bot/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("describe-bot").join("config.toml"))
}
