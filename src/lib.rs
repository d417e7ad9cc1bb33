//! Image Description Bot - describes images sent in chat conversations
//!
//! This library provides the pieces of a single-turn Bot Framework responder:
//! - Activity model and Bot Connector reply channel
//! - Activity routing (messages, welcome on join, ignored system events)
//! - Image pipeline: download, caption, face analysis, streamed replies
//! - Computer Vision REST client
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Bot Framework channel                   │
//! │   Skype  │  Teams  │  Emulator  │  ...              │
//! └────────────────────┬────────────────────────────────┘
//!                      │ POST /api/messages
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Describe Bot                         │
//! │   Router  │  Image Pipeline  │  Bot Connector       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Computer Vision API                     │
//! │   describe  │  analyze (categories, faces)          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod attachments;
pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod router;
pub mod vision;

pub use attachments::{HttpImageFetcher, ImageFetcher, select_image};
pub use channels::{Activity, ActivityType, Attachment, BotConnector, BotCredentials, ReplyChannel};
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{ImagePipeline, PipelineState, TurnOutcome, TurnReport};
pub use router::{ActivityRouter, RouteOutcome, WELCOME_MESSAGE};
pub use vision::{
    AnalysisResult, Caption, DescriptionResult, Face, FaceRectangle, VisionClient, VisionService,
    VisualFeature,
};
