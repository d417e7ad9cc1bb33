//! Configuration management for the image description bot
//!
//! Precedence is env > TOML file > default. The vision settings are required
//! and checked here, so a misconfigured bot fails at startup rather than on
//! its first image.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::attachments::DEFAULT_MAX_IMAGE_BYTES;
use crate::channels::BotCredentials;
use crate::pipeline::DEFAULT_CALL_TIMEOUT;
use crate::{Error, Result};

/// Default HTTP port (Bot Framework convention)
pub const DEFAULT_PORT: u16 = 3978;

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Vision service configuration
    pub vision: VisionConfig,

    /// Bot Framework credentials; `None` for local emulator use
    pub bot: Option<BotCredentials>,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Turn processing limits
    pub pipeline: PipelineConfig,
}

/// Vision service configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Subscription key (from `VISION_API_KEY`)
    pub api_key: SecretString,

    /// Endpoint base URL (from `VISION_API_ENDPOINT`)
    pub endpoint: String,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Turn processing limits
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Budget for each remote call
    pub call_timeout: Duration,

    /// Largest accepted image in bytes
    pub max_image_bytes: usize,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a required setting is missing or invalid, or if an
    /// explicitly given config file cannot be loaded
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path)?;
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a required setting is missing or invalid
    pub fn from_sources(
        fc: file::BotConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_key = env("VISION_API_KEY")
            .or(fc.vision.api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("VISION_API_KEY is required".to_string()))?;
        let endpoint = env("VISION_API_ENDPOINT")
            .or(fc.vision.endpoint)
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| Error::Config("VISION_API_ENDPOINT is required".to_string()))?;

        url::Url::parse(endpoint.trim())
            .map_err(|e| Error::Config(format!("invalid VISION_API_ENDPOINT: {e}")))?;

        let vision = VisionConfig {
            api_key: SecretString::from(api_key),
            endpoint: endpoint.trim().to_string(),
        };

        let app_id = env("MICROSOFT_APP_ID")
            .or(fc.bot.app_id)
            .filter(|id| !id.is_empty());
        let app_password = env("MICROSOFT_APP_PASSWORD")
            .or(fc.bot.app_password)
            .filter(|password| !password.is_empty());
        let tenant = env("MICROSOFT_APP_TENANT").or(fc.bot.tenant);

        let bot = match (app_id, app_password) {
            (Some(app_id), Some(app_password)) => {
                let credentials = BotCredentials::new(app_id, SecretString::from(app_password));
                Some(match tenant {
                    Some(tenant) => credentials.with_tenant(tenant),
                    None => credentials,
                })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::Config(
                    "MICROSOFT_APP_ID is set but MICROSOFT_APP_PASSWORD is missing".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "MICROSOFT_APP_PASSWORD is set but MICROSOFT_APP_ID is missing".to_string(),
                ));
            }
        };

        let port = env("BOT_PORT")
            .or_else(|| env("PORT"))
            .and_then(|s| s.parse().ok())
            .or(fc.server.port)
            .unwrap_or(DEFAULT_PORT);

        let call_timeout = env("BOT_CALL_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .or(fc.pipeline.call_timeout_secs)
            .map_or(DEFAULT_CALL_TIMEOUT, Duration::from_secs);
        if call_timeout.is_zero() {
            return Err(Error::Config("call timeout must be positive".to_string()));
        }

        let max_image_bytes = env("BOT_MAX_IMAGE_BYTES")
            .and_then(|s| s.parse().ok())
            .or(fc.pipeline.max_image_bytes)
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES);

        Ok(Self {
            vision,
            bot,
            server: ServerConfig { port },
            pipeline: PipelineConfig {
                call_timeout,
                max_image_bytes,
            },
        })
    }
}
