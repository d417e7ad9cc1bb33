//! Shared test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image_description_bot::channels::{ChannelAccount, ConversationAccount};
use image_description_bot::{
    Activity, ActivityType, AnalysisResult, Attachment, Caption, DescriptionResult, Error, Face,
    FaceRectangle, ImageFetcher, ImagePipeline, ReplyChannel, Result, VisionService, VisualFeature,
};
use secrecy::SecretString;
use tokio::sync::Mutex;

/// Reply channel that records every reply
#[derive(Default)]
pub struct RecordingChannel {
    pub replies: Mutex<Vec<String>>,
    pub token: Option<String>,
    /// Fail the n-th reply (0-based)
    pub fail_at: Option<usize>,
    /// Hold every reply this long before recording it
    pub reply_delay: Option<Duration>,
    pub token_requests: AtomicUsize,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self {
            reply_delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<String> {
        self.replies.lock().await.clone()
    }
}

#[async_trait]
impl ReplyChannel for RecordingChannel {
    async fn send_reply(&self, _activity: &Activity, text: &str) -> Result<()> {
        if let Some(delay) = self.reply_delay {
            tokio::time::sleep(delay).await;
        }
        let mut replies = self.replies.lock().await;
        if self.fail_at == Some(replies.len()) {
            return Err(Error::Channel("connector unavailable".to_string()));
        }
        replies.push(text.to_string());
        Ok(())
    }

    async fn bearer_token(&self) -> Result<Option<SecretString>> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone().map(SecretString::from))
    }
}

/// Vision service with canned results
#[derive(Default)]
pub struct FakeVision {
    pub description: DescriptionResult,
    pub analysis: AnalysisResult,
    pub describe_error: Option<String>,
    pub analyze_error: Option<String>,
    pub analyze_delay: Option<Duration>,
    pub describe_calls: AtomicUsize,
    pub analyze_calls: AtomicUsize,
}

impl FakeVision {
    pub fn new(captions: &[(&str, f64)], faces: Vec<Face>) -> Self {
        Self {
            description: DescriptionResult {
                captions: captions
                    .iter()
                    .map(|(text, confidence)| Caption {
                        text: (*text).to_string(),
                        confidence: *confidence,
                    })
                    .collect(),
                tags: Vec::new(),
            },
            analysis: AnalysisResult {
                categories: Vec::new(),
                faces: Some(faces),
            },
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst) + self.analyze_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionService for FakeVision {
    async fn describe(&self, image: &[u8], max_candidates: u32) -> Result<DescriptionResult> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!image.is_empty());
        assert_eq!(max_candidates, 3);
        match &self.describe_error {
            Some(message) => Err(Error::Vision(message.clone())),
            None => Ok(self.description.clone()),
        }
    }

    async fn analyze(&self, image: &[u8], features: &[VisualFeature]) -> Result<AnalysisResult> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!image.is_empty());
        assert_eq!(features, [VisualFeature::Categories, VisualFeature::Faces]);
        if let Some(delay) = self.analyze_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.analyze_error {
            Some(message) => Err(Error::Vision(message.clone())),
            None => Ok(self.analysis.clone()),
        }
    }
}

/// Fetcher returning fixed bytes or a fixed error
#[derive(Default)]
pub struct FakeFetcher {
    pub error: Option<String>,
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(
        &self,
        _activity: &Activity,
        url: &str,
        _channel: &dyn ReplyChannel,
    ) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().await.push(url.to_string());
        match &self.error {
            Some(message) => Err(Error::Attachment(message.clone())),
            None => Ok(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        }
    }
}

pub fn account(id: &str) -> ChannelAccount {
    ChannelAccount {
        id: id.to_string(),
        name: None,
    }
}

/// Inbound activity addressed to the bot
pub fn activity(activity_type: ActivityType) -> Activity {
    let mut activity = Activity::new(activity_type);
    activity.id = Some("activity-1".to_string());
    activity.channel_id = Some("emulator".to_string());
    activity.service_url = Some("https://smba.example.net".to_string());
    activity.from = Some(account("user-1"));
    activity.recipient = Some(account("bot-1"));
    activity.conversation = Some(ConversationAccount {
        id: "conversation-1".to_string(),
        is_group: None,
        name: None,
    });
    activity
}

pub fn attachment(content_type: &str, url: &str) -> Attachment {
    Attachment {
        content_type: content_type.to_string(),
        content_url: Some(url.to_string()),
        name: None,
    }
}

/// Message activity carrying one image
pub fn image_message() -> Activity {
    let mut message = activity(ActivityType::Message);
    message.attachments = vec![attachment("image/jpeg", "https://files.example/cat.jpg")];
    message
}

pub fn face(gender: &str, age: u32, left: i32, top: i32) -> Face {
    Face {
        age,
        gender: gender.to_string(),
        face_rectangle: FaceRectangle {
            left,
            top,
            width: 48,
            height: 48,
        },
    }
}

pub fn pipeline(vision: Arc<FakeVision>, fetcher: Arc<FakeFetcher>) -> ImagePipeline {
    ImagePipeline::new(vision, fetcher)
}
