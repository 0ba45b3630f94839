//! Core types for video generation.

use crate::error::{Result, VeoStudioError};
use crate::video::blob::ObjectUrl;
use crate::video::media::MediaFormat;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Veo model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VeoModel {
    /// Veo 3.1 Fast (preview).
    #[default]
    #[serde(rename = "veo-3.1-fast-generate-preview")]
    Veo31Fast,
    /// Veo 3.1 (preview).
    #[serde(rename = "veo-3.1-generate-preview")]
    Veo31,
    /// Veo 3.0 Fast.
    #[serde(rename = "veo-3.0-fast-generate-001")]
    Veo30Fast,
    /// Veo 3.0.
    #[serde(rename = "veo-3.0-generate-001")]
    Veo30,
    /// Veo 2.0, configured by aspect ratio and duration instead of resolution.
    #[serde(rename = "veo-2.0-generate-001")]
    Veo20,
}

impl VeoModel {
    /// All known models, newest first.
    pub const ALL: [VeoModel; 5] = [
        Self::Veo31Fast,
        Self::Veo31,
        Self::Veo30Fast,
        Self::Veo30,
        Self::Veo20,
    ];

    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Veo31Fast => "veo-3.1-fast-generate-preview",
            Self::Veo31 => "veo-3.1-generate-preview",
            Self::Veo30Fast => "veo-3.0-fast-generate-001",
            Self::Veo30 => "veo-3.0-generate-001",
            Self::Veo20 => "veo-2.0-generate-001",
        }
    }

    /// True for the model that uses the aspect-ratio/duration configuration shape.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Veo20)
    }
}

impl std::fmt::Display for VeoModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VeoModel {
    type Err = VeoStudioError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| VeoStudioError::Validation(format!("unknown model: {s}")))
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 landscape.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait.
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// 1280x720.
    #[default]
    #[serde(rename = "720p")]
    P720,
    /// 1920x1080.
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// Returns the resolution as a string (e.g., "720p").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }
}

/// Generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Prompt only, optionally seeded by an image on the legacy model.
    TextToVideo,
    /// Start and/or end frame.
    FramesToVideo,
    /// Asset and style reference images.
    ReferencesToVideo,
    /// Continue a previously generated video.
    ExtendVideo,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextToVideo => write!(f, "text-to-video"),
            Self::FramesToVideo => write!(f, "frames-to-video"),
            Self::ReferencesToVideo => write!(f, "references-to-video"),
            Self::ExtendVideo => write!(f, "extend-video"),
        }
    }
}

/// An input image: raw encoded bytes plus their original media type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Encoded image bytes (PNG, JPEG, ...), never re-encoded.
    pub data: Vec<u8>,
    /// Original MIME type (e.g., "image/png").
    pub mime_type: String,
    /// File name, used only for logging.
    pub name: Option<String>,
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("len", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("name", &self.name)
            .finish()
    }
}

impl ImageInput {
    /// Creates an image input from bytes with an explicit MIME type.
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            name: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reads an image file, detecting its MIME type from content, then extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let format = MediaFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(MediaFormat::from_extension)
            })
            .filter(MediaFormat::is_image)
            .ok_or_else(|| {
                VeoStudioError::Validation(format!(
                    "{} is not a PNG, JPEG or WebP image",
                    path.display()
                ))
            })?;

        let mut input = Self::new(data, format.mime_type());
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            input = input.with_name(name);
        }
        Ok(input)
    }

    /// Returns the name for log output.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<inline image>")
    }
}

/// Opaque provider descriptor for a generated video.
///
/// Kept as the exact JSON the provider returned so it can be sent back
/// verbatim when extending the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoHandle(serde_json::Value);

impl VideoHandle {
    /// Wraps a provider video descriptor.
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Returns the video location URI, if present and non-empty.
    pub fn uri(&self) -> Option<&str> {
        self.0
            .get("uri")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Returns the MIME type the provider reported, if any.
    pub fn mime_type(&self) -> Option<&str> {
        self.0.get("mimeType").and_then(|v| v.as_str())
    }

    /// Returns the inline base64 video bytes, if the provider included them.
    pub fn video_bytes(&self) -> Option<&str> {
        self.0.get("videoBytes").and_then(|v| v.as_str())
    }

    /// Returns the raw descriptor.
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Mode-specific media. Exactly one variant per [`GenerationMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum MediaInputs {
    /// Text-to-video; the seed image is only honored by the legacy model.
    TextToVideo {
        /// Optional starting image.
        seed_image: Option<ImageInput>,
    },
    /// Frames-to-video.
    FramesToVideo {
        /// First frame.
        start_frame: Option<ImageInput>,
        /// Last frame, ignored when `looping` is set.
        end_frame: Option<ImageInput>,
        /// Reuse the start frame as the end frame.
        looping: bool,
    },
    /// References-to-video.
    ReferencesToVideo {
        /// Asset references, in order.
        reference_images: Vec<ImageInput>,
        /// Optional style reference, sent after the assets.
        style_image: Option<ImageInput>,
    },
    /// Extend a previously generated video.
    ExtendVideo {
        /// Handle returned by an earlier generation.
        video: Option<VideoHandle>,
    },
}

impl MediaInputs {
    /// Returns the generation mode for these inputs.
    pub fn mode(&self) -> GenerationMode {
        match self {
            Self::TextToVideo { .. } => GenerationMode::TextToVideo,
            Self::FramesToVideo { .. } => GenerationMode::FramesToVideo,
            Self::ReferencesToVideo { .. } => GenerationMode::ReferencesToVideo,
            Self::ExtendVideo { .. } => GenerationMode::ExtendVideo,
        }
    }
}

/// A request to generate one video.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model to generate with.
    pub model: VeoModel,
    /// Text prompt; may be empty, in which case it is not sent.
    pub prompt: String,
    /// Aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Target resolution (non-legacy models).
    pub resolution: Resolution,
    /// Duration in seconds (legacy model only).
    pub duration_secs: Option<u32>,
    /// Allow adult people in the output (legacy model only).
    pub allow_people: Option<bool>,
    /// Mode-specific media.
    pub inputs: MediaInputs,
}

impl GenerationRequest {
    fn with_inputs(prompt: impl Into<String>, inputs: MediaInputs) -> Self {
        Self {
            model: VeoModel::default(),
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            duration_secs: None,
            allow_people: None,
            inputs,
        }
    }

    /// Creates a text-to-video request.
    pub fn text_to_video(prompt: impl Into<String>) -> Self {
        Self::with_inputs(prompt, MediaInputs::TextToVideo { seed_image: None })
    }

    /// Creates a frames-to-video request.
    pub fn frames_to_video(
        prompt: impl Into<String>,
        start_frame: Option<ImageInput>,
        end_frame: Option<ImageInput>,
    ) -> Self {
        Self::with_inputs(
            prompt,
            MediaInputs::FramesToVideo {
                start_frame,
                end_frame,
                looping: false,
            },
        )
    }

    /// Creates a references-to-video request.
    pub fn references_to_video(
        prompt: impl Into<String>,
        reference_images: Vec<ImageInput>,
        style_image: Option<ImageInput>,
    ) -> Self {
        Self::with_inputs(
            prompt,
            MediaInputs::ReferencesToVideo {
                reference_images,
                style_image,
            },
        )
    }

    /// Creates an extend-video request.
    pub fn extend_video(prompt: impl Into<String>, video: Option<VideoHandle>) -> Self {
        Self::with_inputs(prompt, MediaInputs::ExtendVideo { video })
    }

    /// Derives a request that extends `video`.
    ///
    /// Keeps model and aspect ratio, clears the prompt, drops all other
    /// media and forces 720p, which extension requires.
    pub fn extension_of(&self, video: VideoHandle) -> Self {
        Self {
            model: self.model,
            prompt: String::new(),
            aspect_ratio: self.aspect_ratio,
            resolution: Resolution::P720,
            duration_secs: self.duration_secs,
            allow_people: self.allow_people,
            inputs: MediaInputs::ExtendVideo { video: Some(video) },
        }
    }

    /// Returns the generation mode.
    pub fn mode(&self) -> GenerationMode {
        self.inputs.mode()
    }

    /// Sets the model.
    pub fn with_model(mut self, model: VeoModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the desired video duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Sets the person-generation policy flag.
    pub fn with_allow_people(mut self, allow: bool) -> Self {
        self.allow_people = Some(allow);
        self
    }

    /// Sets the seed image. No effect outside text-to-video.
    pub fn with_seed_image(mut self, image: ImageInput) -> Self {
        if let MediaInputs::TextToVideo { seed_image } = &mut self.inputs {
            *seed_image = Some(image);
        }
        self
    }

    /// Sets the looping flag. No effect outside frames-to-video.
    pub fn with_looping(mut self, value: bool) -> Self {
        if let MediaInputs::FramesToVideo { looping, .. } = &mut self.inputs {
            *looping = value;
        }
        self
    }
}

/// Metadata about the generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Wall-clock generation time in milliseconds.
    pub duration_ms: Option<u64>,
    /// Provider operation name.
    pub operation: Option<String>,
}

/// The result of a successful generation.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    /// Local object URL for playback; revoke it when the artifact is discarded.
    pub object_url: ObjectUrl,
    /// Raw video bytes.
    pub data: Bytes,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// URL the bytes were fetched from.
    pub download_url: String,
    /// Provider handle, needed verbatim to extend this video.
    pub video: VideoHandle,
    /// Generation metadata.
    pub metadata: VideoMetadata,
}

impl GeneratedArtifact {
    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the video to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Saves the provider handle as JSON, for a later extension.
    pub fn save_handle(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(&self.video)?)?;
        Ok(())
    }
}

/// Loads a handle written by [`GeneratedArtifact::save_handle`].
pub fn load_handle(path: impl AsRef<Path>) -> Result<VideoHandle> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}
