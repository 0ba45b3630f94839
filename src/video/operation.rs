//! Long-running operation snapshots and generated-artifact extraction.

use crate::video::types::VideoHandle;
use serde::{Deserialize, Serialize};

/// A snapshot of a remote generation job.
///
/// Snapshots are never patched in place: each poll yields a new value that
/// replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Stable operation name (e.g., `models/veo-3.1-generate-preview/operations/abc`).
    #[serde(default)]
    pub name: String,
    /// Completion flag; absent means not done.
    #[serde(default)]
    pub done: bool,
    /// Result payload, once complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<OperationResponse>,
    /// Error descriptor, once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
    /// Provider progress metadata, passed through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// The `response` field of a completed operation.
///
/// The SDK normalizes results into `generatedVideos`; the raw REST API nests
/// them under `generateVideoResponse.generatedSamples`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    /// SDK-normalized shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_videos: Option<Vec<GeneratedSample>>,
    /// Raw REST shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_video_response: Option<RawVideoResponse>,
}

/// Raw REST result body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVideoResponse {
    /// Generated videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_samples: Option<Vec<GeneratedSample>>,
    /// Number of videos removed by safety filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rai_media_filtered_count: Option<u32>,
    /// Why they were removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rai_media_filtered_reasons: Option<Vec<String>>,
}

/// One generated video entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSample {
    /// Provider handle; opaque except for its URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoHandle>,
}

/// Error descriptor of a failed operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    /// Status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Any other fields.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl OperationError {
    /// Message for display, falling back to the descriptor's JSON.
    pub fn describe(&self) -> String {
        match self.message.as_deref().filter(|m| !m.is_empty()) {
            Some(message) => message.to_string(),
            None => serde_json::to_string(self).unwrap_or_else(|_| "unknown error".into()),
        }
    }
}

impl Operation {
    /// Rewrites a raw REST snapshot into the SDK shape.
    ///
    /// Moves `generateVideoResponse.generatedSamples` to `generatedVideos`
    /// unless the SDK field is already present.
    pub fn into_sdk_shape(mut self) -> Self {
        if let Some(response) = self.response.as_mut() {
            if response.generated_videos.is_none() {
                if let Some(raw) = response.generate_video_response.as_mut() {
                    if let Some(samples) = raw.generated_samples.take() {
                        response.generated_videos = Some(samples);
                    }
                }
            }
        }
        self
    }
}

/// Generated artifacts found in a response, tagged by the shape they came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactList {
    /// Found under `generatedVideos`.
    Sdk(Vec<GeneratedSample>),
    /// Found under `generateVideoResponse.generatedSamples`.
    Raw(Vec<GeneratedSample>),
}

impl ArtifactList {
    /// Normalizes a response, trying the SDK shape first, then the raw shape.
    ///
    /// Returns `None` when neither field is present.
    pub fn from_response(response: &OperationResponse) -> Option<Self> {
        if let Some(videos) = &response.generated_videos {
            return Some(Self::Sdk(videos.clone()));
        }
        response
            .generate_video_response
            .as_ref()
            .and_then(|raw| raw.generated_samples.clone())
            .map(Self::Raw)
    }

    /// Returns the entries regardless of shape.
    pub fn samples(&self) -> &[GeneratedSample] {
        match self {
            Self::Sdk(samples) | Self::Raw(samples) => samples,
        }
    }

    /// Consumes the list, returning the first entry.
    pub fn into_first(self) -> Option<GeneratedSample> {
        match self {
            Self::Sdk(samples) | Self::Raw(samples) => samples.into_iter().next(),
        }
    }
}
