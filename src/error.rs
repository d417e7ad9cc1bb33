//! Error types for the image description bot

use std::time::Duration;

use thiserror::Error;

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a turn or starting the bot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Reply channel error (Bot Connector, token acquisition)
    #[error("channel error: {0}")]
    Channel(String),

    /// Attachment download error
    #[error("attachment error: {0}")]
    Attachment(String),

    /// Vision API error
    #[error("vision error: {0}")]
    Vision(String),

    /// A remote call exceeded its time budget
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Name of the remote call
        operation: &'static str,
        /// Configured budget
        timeout: Duration,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error came from delivering a reply rather than producing one
    ///
    /// Reply delivery failures cannot be reported back to the user, so the
    /// pipeline lets them escape the turn instead of converting them into an
    /// error reply.
    #[must_use]
    pub const fn is_reply_delivery(&self) -> bool {
        matches!(self, Self::Channel(_))
    }
}
