//! Remote image captioning and face analysis
//!
//! The result model mirrors the Computer Vision REST responses closely enough
//! to deserialize them directly.

mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::VisionClient;

use crate::Result;

/// Number of ranked captions requested per image
pub const MAX_CAPTIONS: u32 = 3;

/// Visual features the analyze call can extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualFeature {
    Categories,
    Faces,
}

impl VisualFeature {
    /// Name used in the `visualFeatures` query parameter
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "Categories",
            Self::Faces => "Faces",
        }
    }
}

/// Ranked captions for an image
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DescriptionResult {
    /// Captions in ranked order; may be empty
    #[serde(default)]
    pub captions: Vec<Caption>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One caption candidate
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Caption {
    /// Caption text
    pub text: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

/// Category and face analysis for an image
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AnalysisResult {
    /// Detected categories
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Detected faces; absent when face detection was not run
    #[serde(default)]
    pub faces: Option<Vec<Face>>,
}

impl AnalysisResult {
    /// Detected faces, empty when none were found or detection was skipped
    #[must_use]
    pub fn faces(&self) -> &[Face] {
        self.faces.as_deref().unwrap_or_default()
    }
}

/// Image category
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Category {
    /// Category name, e.g. `animal_cat`
    pub name: String,
    /// Score in `[0, 1]`
    #[serde(default)]
    pub score: f64,
}

/// Detected face
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    /// Estimated age in years
    pub age: u32,
    /// Gender tag as reported by the service
    pub gender: String,
    /// Face position in pixels
    pub face_rectangle: FaceRectangle,
}

/// Face bounding box in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FaceRectangle {
    pub left: i32,
    pub top: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

/// Remote vision service
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Generate up to `max_candidates` ranked captions
    ///
    /// # Errors
    ///
    /// Returns `Error::Vision` if the remote call fails
    async fn describe(&self, image: &[u8], max_candidates: u32) -> Result<DescriptionResult>;

    /// Run the requested feature extraction
    ///
    /// # Errors
    ///
    /// Returns `Error::Vision` if the remote call fails
    async fn analyze(&self, image: &[u8], features: &[VisualFeature]) -> Result<AnalysisResult>;
}
