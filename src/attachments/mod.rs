//! Image attachment selection and download
//!
//! Attachments on some channels are only reachable with the bot's own
//! connector token, so the download takes the reply channel along.

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::channels::{Activity, Attachment, ReplyChannel};
use crate::{Error, Result};

/// Default upper bound on downloaded image size (10MB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Pick the first attachment whose content type mentions "image"
///
/// The match is a case-sensitive substring test, so `image/png` and
/// `application/x-image` qualify while `Image/PNG` does not.
#[must_use]
pub fn select_image(attachments: &[Attachment]) -> Option<&Attachment> {
    attachments
        .iter()
        .find(|attachment| attachment.content_type.contains("image"))
}

/// Fetches attachment bytes for a turn
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download the bytes behind `url` for the given activity
    ///
    /// # Errors
    ///
    /// Returns `Error::Attachment` if the download fails
    async fn fetch(
        &self,
        activity: &Activity,
        url: &str,
        channel: &dyn ReplyChannel,
    ) -> Result<Vec<u8>>;
}

/// Downloads attachments over HTTP
pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageFetcher {
    /// Create a new fetcher
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Set the maximum accepted image size in bytes
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(
        &self,
        activity: &Activity,
        url: &str,
        channel: &dyn ReplyChannel,
    ) -> Result<Vec<u8>> {
        let url = url::Url::parse(url)
            .map_err(|e| Error::Attachment(format!("invalid attachment URL: {e}")))?;

        let mut request = self.client.get(url);

        if activity.requires_download_token() {
            let token = channel
                .bearer_token()
                .await
                .map_err(|e| Error::Attachment(format!("token acquisition failed: {e}")))?;
            if let Some(token) = token {
                request = request.bearer_auth(token.expose_secret());
            } else {
                tracing::warn!("no bot credentials configured; downloading without token");
            }
            request = request.header(reqwest::header::ACCEPT, "application/octet-stream");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Attachment(format!("download failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Attachment(format!(
                "download failed: {}",
                response.status()
            )));
        }

        if let Some(length) = response.content_length()
            && usize::try_from(length).unwrap_or(usize::MAX) > self.max_bytes
        {
            return Err(Error::Attachment(format!(
                "image too large: {length} bytes (limit {})",
                self.max_bytes
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Attachment(format!("read failed: {e}")))?;

        if bytes.len() > self.max_bytes {
            return Err(Error::Attachment(format!(
                "image too large: {} bytes (limit {})",
                bytes.len(),
                self.max_bytes
            )));
        }

        tracing::debug!(bytes = bytes.len(), "attachment downloaded");
        Ok(bytes.to_vec())
    }
}
