//! Activity dispatch
//!
//! Messages go to the image pipeline, the bot greets a conversation it was
//! added to, and every other activity type is accepted and ignored.

use std::sync::Arc;

use crate::channels::{Activity, ActivityType, ReplyChannel};
use crate::pipeline::{ImagePipeline, TurnReport, send_reply_within};
use crate::Result;

/// Greeting sent when the bot joins a conversation
pub const WELCOME_MESSAGE: &str = "### Welcome to Image Description Bot!\n\
Drop me an image and I'll do my best describe what's on it :)";

/// What routing an activity did
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// A message turn ran through the pipeline
    Pipeline(TurnReport),
    /// The bot was added to the conversation and said hello
    Welcomed,
    /// Nothing to do for this activity
    Ignored(ActivityType),
}

/// Routes inbound activities by type
#[derive(Clone)]
pub struct ActivityRouter {
    pipeline: Arc<ImagePipeline>,
}

impl ActivityRouter {
    /// Create a router around a shared pipeline
    #[must_use]
    pub const fn new(pipeline: Arc<ImagePipeline>) -> Self {
        Self { pipeline }
    }

    /// Dispatch one inbound activity
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if a reply cannot be delivered
    pub async fn route(&self, activity: &Activity, channel: &dyn ReplyChannel) -> Result<RouteOutcome> {
        match activity.activity_type {
            ActivityType::Message => {
                let report = self.pipeline.handle(activity, channel).await?;
                Ok(RouteOutcome::Pipeline(report))
            }
            ActivityType::ConversationUpdate => {
                if !activity.bot_was_added() {
                    return Ok(RouteOutcome::Ignored(ActivityType::ConversationUpdate));
                }
                tracing::info!(
                    conversation = activity.conversation_id().unwrap_or_default(),
                    "bot added to conversation"
                );
                send_reply_within(
                    channel,
                    activity,
                    WELCOME_MESSAGE,
                    self.pipeline.call_timeout(),
                )
                .await?;
                Ok(RouteOutcome::Welcomed)
            }
            ActivityType::DeleteUserData => {
                // No user data is stored, nothing to erase
                tracing::debug!("delete user data requested");
                Ok(RouteOutcome::Ignored(activity.activity_type))
            }
            other => {
                tracing::debug!(activity_type = ?other, "ignoring activity");
                Ok(RouteOutcome::Ignored(other))
            }
        }
    }
}
