//! Bot Framework activity model and the reply channel abstraction
//!
//! Inbound activities arrive as Bot Framework JSON. Replies always go back
//! through the conversation the triggering activity came from.

mod connector;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

pub use connector::{BotConnector, BotCredentials};

use crate::Result;

/// Channel identifier whose attachment URLs require a bearer token
pub const SKYPE_CHANNEL_ID: &str = "skype";

/// Activity type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    Message,
    ConversationUpdate,
    ContactRelationUpdate,
    Typing,
    Ping,
    DeleteUserData,
    EndOfConversation,
    Event,
    Invoke,
    InstallationUpdate,
    MessageReaction,
    /// Any type this bot does not know about
    #[serde(other)]
    Unknown,
}

/// Bot Framework activity
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity type
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Activity ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Timestamp (ISO 8601, passed through untouched)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Transport identifier, e.g. "skype", "msteams", "emulator"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Base URL for replies on this conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    /// Sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    /// Recipient (the bot, for inbound activities)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    /// Conversation info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    /// Message text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Text format hint for outbound messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_format: Option<String>,
    /// Activity this one replies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    /// Participants added (conversation updates only)
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub members_added: Vec<ChannelAccount>,
    /// Attachments (messages only)
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attachments: Vec<Attachment>,
}

/// Read an explicit JSON `null` the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Channel account (user or bot)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    /// Account ID
    pub id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Conversation account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    /// Conversation ID
    pub id: String,
    /// Whether this is a group conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    /// Conversation name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// File reference carried by a message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// MIME type
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_type: String,
    /// Download URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    /// Filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Activity {
    /// Create an empty activity of the given type
    #[must_use]
    pub const fn new(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            id: None,
            timestamp: None,
            channel_id: None,
            service_url: None,
            from: None,
            recipient: None,
            conversation: None,
            text: None,
            text_format: None,
            reply_to_id: None,
            members_added: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Build the outbound reply to this activity
    ///
    /// Sender and recipient are swapped and the conversation is kept, so a
    /// reply can never leave the conversation it answers.
    #[must_use]
    pub fn create_reply(&self, text: impl Into<String>) -> Self {
        Self {
            activity_type: ActivityType::Message,
            id: None,
            timestamp: None,
            channel_id: self.channel_id.clone(),
            service_url: self.service_url.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            text: Some(text.into()),
            text_format: Some("markdown".to_string()),
            reply_to_id: self.id.clone(),
            members_added: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Whether the bot itself is among the members added by this activity
    #[must_use]
    pub fn bot_was_added(&self) -> bool {
        let Some(bot) = &self.recipient else {
            return false;
        };
        self.members_added.iter().any(|member| member.id == bot.id)
    }

    /// Whether this activity came from the channel with authenticated downloads
    #[must_use]
    pub fn requires_download_token(&self) -> bool {
        self.channel_id.as_deref() == Some(SKYPE_CHANNEL_ID)
    }

    /// Conversation ID, if present
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.id.as_str())
    }
}

/// Outbound side of a conversation, supplied by the hosting layer
///
/// Implementations derive the destination from the triggering activity
/// (service URL + conversation), which keeps every reply of a turn on one
/// reply channel.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Send a text reply into the conversation of `activity`
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if the reply cannot be delivered
    async fn send_reply(&self, activity: &Activity, text: &str) -> Result<()>;

    /// Bearer token for channel-authenticated downloads
    ///
    /// Returns `None` when no bot credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if the token cannot be obtained
    async fn bearer_token(&self) -> Result<Option<SecretString>>;
}
