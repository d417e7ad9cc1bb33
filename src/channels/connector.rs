//! Bot Connector client for replying to conversations
//!
//! Uses the OAuth 2.0 client credentials flow for authentication. Without
//! credentials (local emulator) replies are sent unauthenticated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{Activity, ReplyChannel};
use crate::{Error, Result};

const DEFAULT_TENANT: &str = "botframework.com";
const TOKEN_SCOPE: &str = "https://api.botframework.com/.default";

/// Refresh tokens this long before they expire
const REFRESH_SKEW: Duration = Duration::from_secs(60);

/// Bot application credentials
#[derive(Debug, Clone)]
pub struct BotCredentials {
    /// Bot application (client) ID
    pub app_id: String,
    /// Bot application password (client secret)
    pub app_password: SecretString,
    /// Azure AD tenant issuing tokens
    pub tenant: String,
}

impl BotCredentials {
    /// Credentials for the default multi-tenant Bot Framework authority
    #[must_use]
    pub fn new(app_id: String, app_password: SecretString) -> Self {
        Self {
            app_id,
            app_password,
            tenant: DEFAULT_TENANT.to_string(),
        }
    }

    /// Override the tenant
    #[must_use]
    pub fn with_tenant(mut self, tenant: String) -> Self {
        self.tenant = tenant;
        self
    }

    fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant
        )
    }
}

/// Cached token info
struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at > Instant::now() + REFRESH_SKEW
    }
}

/// OAuth token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Shared Bot Connector client
///
/// Cheap to clone; clones share the HTTP connection pool and token cache.
#[derive(Clone)]
pub struct BotConnector {
    client: reqwest::Client,
    credentials: Option<BotCredentials>,
    token_url: Option<String>,
    token_cache: Arc<Mutex<Option<CachedToken>>>,
}

impl BotConnector {
    /// Create a connector
    ///
    /// Pass `None` for unauthenticated local development.
    #[must_use]
    pub fn new(client: reqwest::Client, credentials: Option<BotCredentials>) -> Self {
        let token_url = credentials.as_ref().map(BotCredentials::token_url);
        Self {
            client,
            credentials,
            token_url,
            token_cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the token endpoint
    #[must_use]
    pub fn with_token_url(mut self, url: String) -> Self {
        self.token_url = Some(url);
        self
    }

    /// Whether replies will be authenticated
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Get or refresh the access token
    async fn access_token(&self) -> Result<Option<SecretString>> {
        let (Some(credentials), Some(token_url)) = (&self.credentials, &self.token_url) else {
            return Ok(None);
        };

        {
            let guard = self.token_cache.lock().await;
            if let Some(cached) = guard.as_ref()
                && cached.is_valid()
            {
                return Ok(Some(cached.token.clone()));
            }
        }

        let response = self
            .client
            .post(token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.app_id.as_str()),
                ("client_secret", credentials.app_password.expose_secret()),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| Error::Channel(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "token request failed: {status} - {body}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Channel(format!("token parse error: {e}")))?;

        let ttl = body.expires_in.unwrap_or(3600).max(120);
        let token = SecretString::from(body.access_token);

        let mut guard = self.token_cache.lock().await;
        *guard = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });

        tracing::debug!(ttl_secs = ttl, "bot connector token refreshed");
        Ok(Some(token))
    }
}

/// Build the reply URL for an inbound activity
fn reply_url(activity: &Activity) -> Result<String> {
    let service_url = activity
        .service_url
        .as_deref()
        .ok_or_else(|| Error::Channel("activity without serviceUrl".to_string()))?;
    let conversation_id = activity
        .conversation_id()
        .ok_or_else(|| Error::Channel("activity without conversation".to_string()))?;

    let base = format!(
        "{}/v3/conversations/{}/activities",
        service_url.trim_end_matches('/'),
        urlencoding::encode(conversation_id)
    );

    Ok(match activity.id.as_deref() {
        Some(id) => format!("{base}/{}", urlencoding::encode(id)),
        None => base,
    })
}

#[async_trait]
impl ReplyChannel for BotConnector {
    async fn send_reply(&self, activity: &Activity, text: &str) -> Result<()> {
        let url = reply_url(activity)?;
        let reply = activity.create_reply(text);

        let mut request = self.client.post(&url).json(&reply);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Channel(format!("reply send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "reply send failed: {status} - {body}"
            )));
        }

        tracing::debug!(
            conversation = activity.conversation_id().unwrap_or_default(),
            "reply sent"
        );
        Ok(())
    }

    async fn bearer_token(&self) -> Result<Option<SecretString>> {
        self.access_token().await
    }
}
