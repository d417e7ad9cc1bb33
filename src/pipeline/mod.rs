//! Image description turn
//!
//! One inbound message is one turn: pick an image, download it, caption and
//! analyze it, and stream the results back as separate replies. Nothing is
//! kept between turns; the next message starts again from
//! [`PipelineState::AwaitingMessage`].

pub mod format;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::attachments::{ImageFetcher, select_image};
use crate::channels::{Activity, Attachment, ReplyChannel};
use crate::vision::{MAX_CAPTIONS, VisionService, VisualFeature};
use crate::{Error, Result};

/// Default budget for each remote call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

const ANALYZE_FEATURES: [VisualFeature; 2] = [VisualFeature::Categories, VisualFeature::Faces];

/// Where a turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    AwaitingMessage,
    AttachmentCheck,
    Downloading,
    Analyzing,
    Replying,
    Failed,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No image attachment; the user was prompted for one
    NoImage,
    /// Captions (and faces, if any) were sent
    Completed,
    /// Download or analysis failed; an error reply was sent
    Failed {
        /// State the turn was in when it failed
        stage: PipelineState,
        /// Error relayed to the user
        error: String,
    },
}

/// Summary of a finished turn
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// How the turn ended
    pub outcome: TurnOutcome,
    /// Reply texts in the order they were sent
    pub replies: Vec<String>,
}

/// Per-turn bookkeeping
struct Turn<'a> {
    activity: &'a Activity,
    channel: &'a dyn ReplyChannel,
    reply_timeout: Duration,
    state: PipelineState,
    replies: Vec<String>,
}

impl<'a> Turn<'a> {
    fn new(activity: &'a Activity, channel: &'a dyn ReplyChannel, reply_timeout: Duration) -> Self {
        Self {
            activity,
            channel,
            reply_timeout,
            state: PipelineState::AwaitingMessage,
            replies: Vec::new(),
        }
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::trace!(from = ?self.state, to = ?state, "pipeline transition");
        self.state = state;
    }

    /// Send a reply right away and record it
    async fn reply(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        send_reply_within(self.channel, self.activity, &text, self.reply_timeout).await?;
        self.replies.push(text);
        Ok(())
    }

    fn finish(mut self, outcome: TurnOutcome) -> TurnReport {
        self.enter(PipelineState::AwaitingMessage);
        TurnReport {
            outcome,
            replies: self.replies,
        }
    }
}

/// Describes images sent in messages
///
/// Built once at startup and shared by every turn.
pub struct ImagePipeline {
    vision: Arc<dyn VisionService>,
    fetcher: Arc<dyn ImageFetcher>,
    call_timeout: Duration,
}

impl ImagePipeline {
    /// Create a pipeline with the default per-call timeout
    #[must_use]
    pub fn new(vision: Arc<dyn VisionService>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            vision,
            fetcher,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the budget for each remote call
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Budget for each remote call, reply sends included
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Handle one message activity
    ///
    /// Replies are sent through `channel` as soon as they are produced.
    /// Download and vision failures end the turn with a single error reply
    /// and an `Ok` report.
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if a reply cannot be delivered within the
    /// call timeout; the turn is abandoned at that point.
    pub async fn handle(&self, activity: &Activity, channel: &dyn ReplyChannel) -> Result<TurnReport> {
        let mut turn = Turn::new(activity, channel, self.call_timeout);
        turn.enter(PipelineState::AttachmentCheck);

        let Some(image) = select_image(&activity.attachments) else {
            tracing::debug!(
                attachments = activity.attachments.len(),
                "no image attachment"
            );
            turn.reply(format::NO_IMAGE_PROMPT).await?;
            return Ok(turn.finish(TurnOutcome::NoImage));
        };

        match self.describe_image(&mut turn, image).await {
            Ok(()) => {
                tracing::info!(replies = turn.replies.len(), "image described");
                Ok(turn.finish(TurnOutcome::Completed))
            }
            Err(e) if e.is_reply_delivery() => Err(e),
            Err(e) => {
                let stage = turn.state;
                turn.enter(PipelineState::Failed);
                tracing::warn!(stage = ?stage, error = %e, "image turn failed");

                turn.reply(format::error_reply(&e)).await?;
                Ok(turn.finish(TurnOutcome::Failed {
                    stage,
                    error: e.to_string(),
                }))
            }
        }
    }

    async fn describe_image(&self, turn: &mut Turn<'_>, image: &Attachment) -> Result<()> {
        turn.reply(format::DOWNLOADING).await?;

        turn.enter(PipelineState::Downloading);
        let url = image
            .content_url
            .as_deref()
            .ok_or_else(|| Error::Attachment("image attachment without contentUrl".to_string()))?;
        let bytes = self
            .timed("download", self.fetcher.fetch(turn.activity, url, turn.channel))
            .await?;

        tracing::debug!(
            bytes = bytes.len(),
            content_type = %image.content_type,
            "image downloaded"
        );
        turn.reply(format::PROCESSING).await?;

        // Both calls must succeed; the first failure drops the other
        turn.enter(PipelineState::Analyzing);
        let (description, analysis) = futures::try_join!(
            self.timed("describe", self.vision.describe(&bytes, MAX_CAPTIONS)),
            self.timed("analyze", self.vision.analyze(&bytes, &ANALYZE_FEATURES)),
        )?;
        drop(bytes);

        turn.enter(PipelineState::Replying);
        turn.reply(format::captions_reply(&description)).await?;
        if let Some(faces) = format::faces_reply(&analysis) {
            turn.reply(faces).await?;
        }

        Ok(())
    }

    /// Run a remote call under the per-call timeout
    async fn timed<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| Error::Timeout {
                operation,
                timeout: self.call_timeout,
            })?
    }
}

/// Send one reply, giving up after `timeout`
///
/// A reply that does not complete in time counts as undeliverable.
///
/// # Errors
///
/// Returns `Error::Channel` if the reply fails or times out
pub(crate) async fn send_reply_within(
    channel: &dyn ReplyChannel,
    activity: &Activity,
    text: &str,
    timeout: Duration,
) -> Result<()> {
    tokio::time::timeout(timeout, channel.send_reply(activity, text))
        .await
        .map_err(|_| Error::Channel(format!("reply send timed out after {timeout:?}")))?
}
