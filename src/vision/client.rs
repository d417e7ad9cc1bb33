//! Computer Vision REST client
//!
//! Sends raw image bytes to the `describe` and `analyze` endpoints

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AnalysisResult, DescriptionResult, VisionService, VisualFeature};
use crate::{Error, Result};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Vision client, constructed once and shared across turns
pub struct VisionClient {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
}

/// Describe response envelope
#[derive(Debug, Deserialize)]
struct DescribeResponse {
    #[serde(default)]
    description: Option<DescriptionResult>,
}

/// Error body returned by the service
///
/// Older API versions put `code`/`message` at the top level, newer ones
/// wrap them in `error`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl VisionClient {
    /// Create a new vision client
    ///
    /// # Errors
    ///
    /// Returns error if the API key or endpoint is empty
    pub fn new(client: reqwest::Client, api_key: SecretString, endpoint: &str) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("vision API key required".to_string()));
        }
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(Error::Config("vision API endpoint required".to_string()));
        }

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.to_string(),
        })
    }

    /// Endpoint base URL, without trailing slash
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST image bytes to `{endpoint}/{path}` and return the response body
    async fn post_image(&self, path: &str, query: &[(&str, String)], image: &[u8]) -> Result<String> {
        let url = format!("{}/{path}", self.endpoint);

        let response = self
            .client
            .post(&url)
            .query(query)
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| Error::Vision(format!("{path} request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Vision(format!("{path} read failed: {e}")))?;

        if !status.is_success() {
            return Err(Error::Vision(format!(
                "{path} failed with {status}: {}",
                error_message(&body)
            )));
        }

        Ok(body)
    }
}

/// Extract a readable message from an error body
fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) else {
        return body.to_string();
    };

    let (code, message) = match parsed.error {
        Some(detail) => (detail.code, detail.message),
        None => (parsed.code, parsed.message),
    };

    match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (None, Some(message)) => message,
        (Some(code), None) => code,
        (None, None) => body.to_string(),
    }
}

#[async_trait]
impl VisionService for VisionClient {
    async fn describe(&self, image: &[u8], max_candidates: u32) -> Result<DescriptionResult> {
        let body = self
            .post_image(
                "describe",
                &[("maxCandidates", max_candidates.to_string())],
                image,
            )
            .await?;

        let parsed: DescribeResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Vision(format!("describe parse error: {e}")))?;
        let description = parsed.description.unwrap_or_default();

        tracing::debug!(captions = description.captions.len(), "image described");
        Ok(description)
    }

    async fn analyze(&self, image: &[u8], features: &[VisualFeature]) -> Result<AnalysisResult> {
        let visual_features = features
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let body = self
            .post_image("analyze", &[("visualFeatures", visual_features)], image)
            .await?;

        let analysis: AnalysisResult = serde_json::from_str(&body)
            .map_err(|e| Error::Vision(format!("analyze parse error: {e}")))?;

        tracing::debug!(
            categories = analysis.categories.len(),
            faces = analysis.faces().len(),
            "image analyzed"
        );
        Ok(analysis)
    }
}
