//! Request builder: maps a [`GenerationRequest`] to a provider payload.
//!
//! Building is pure. [`build`] produces the SDK-level [`ProviderPayload`];
//! [`ProviderPayload::to_predict_request`] lowers it to the REST
//! `predictLongRunning` body.

use crate::error::{Result, VeoStudioError};
use crate::video::types::{
    AspectRatio, GenerationRequest, ImageInput, MediaInputs, Resolution, VeoModel, VideoHandle,
};
use base64::Engine;
use serde::{Serialize, Serializer};

/// Outputs requested per generation.
const NUMBER_OF_VIDEOS: u32 = 1;

/// Person-generation policy sent when people are allowed (legacy model).
const ALLOW_ADULT: &str = "allow_adult";

/// An image attached to a payload: encoded bytes plus original MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    /// Encoded image bytes, serialized as base64.
    #[serde(serialize_with = "serialize_base64")]
    pub image_bytes: Vec<u8>,
    /// MIME type of `image_bytes`.
    pub mime_type: String,
}

impl ImageAttachment {
    fn from_input(input: &ImageInput) -> Result<Self> {
        if input.data.is_empty() {
            return Err(VeoStudioError::Validation(format!(
                "image {} is empty",
                input.display_name()
            )));
        }
        if input.mime_type.trim().is_empty() {
            return Err(VeoStudioError::Validation(format!(
                "image {} has no media type",
                input.display_name()
            )));
        }
        Ok(Self {
            image_bytes: input.data.clone(),
            mime_type: input.mime_type.clone(),
        })
    }

    fn to_wire(&self) -> WireImage {
        WireImage {
            bytes_base64_encoded: base64::engine::general_purpose::STANDARD
                .encode(&self.image_bytes),
            mime_type: self.mime_type.clone(),
        }
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// How a reference image guides generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    /// Subject or object to include.
    Asset,
    /// Visual style to imitate.
    Style,
}

/// A reference image entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    /// The image.
    pub image: ImageAttachment,
    /// Asset or style.
    pub reference_type: ReferenceType,
}

/// Generation config in the SDK shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    /// Always one.
    pub number_of_videos: u32,
    /// Aspect ratio; omitted for extensions on newer models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    /// Resolution; newer models only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    /// Duration; legacy model only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// `allow_adult` when people are allowed on the legacy model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_generation: Option<String>,
    /// End frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame: Option<ImageAttachment>,
    /// Asset and style references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_images: Option<Vec<ReferenceImage>>,
}

/// A job submission in the SDK shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayload {
    /// Model to run.
    pub model: VeoModel,
    /// Prompt, absent when the request prompt is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Starting image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
    /// Video to extend, exactly as the provider returned it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoHandle>,
    /// Generation config.
    pub config: VideoConfig,
}

/// Builds the provider payload for a request.
///
/// Fails with [`VeoStudioError::Validation`] when the request is internally
/// inconsistent, e.g. extend-video without a video handle.
pub fn build(request: &GenerationRequest) -> Result<ProviderPayload> {
    let mut payload = base_payload(request);

    match &request.inputs {
        MediaInputs::TextToVideo { seed_image } => {
            attach_seed_image(&mut payload, seed_image.as_ref())?
        }
        MediaInputs::FramesToVideo {
            start_frame,
            end_frame,
            looping,
        } => attach_frames(
            &mut payload,
            start_frame.as_ref(),
            end_frame.as_ref(),
            *looping,
        )?,
        MediaInputs::ReferencesToVideo {
            reference_images,
            style_image,
        } => attach_references(&mut payload, reference_images, style_image.as_ref())?,
        MediaInputs::ExtendVideo { video } => attach_video(&mut payload, video.as_ref())?,
    }

    Ok(payload)
}

fn base_payload(request: &GenerationRequest) -> ProviderPayload {
    let mut config = VideoConfig {
        number_of_videos: NUMBER_OF_VIDEOS,
        aspect_ratio: None,
        resolution: None,
        duration_seconds: None,
        person_generation: None,
        last_frame: None,
        reference_images: None,
    };

    if request.model.is_legacy() {
        config.aspect_ratio = Some(request.aspect_ratio);
        config.duration_seconds = request.duration_secs;
        if request.allow_people == Some(true) {
            config.person_generation = Some(ALLOW_ADULT.to_string());
        }
    } else {
        config.resolution = Some(request.resolution);
        // The extended video already fixes framing.
        if !matches!(request.inputs, MediaInputs::ExtendVideo { .. }) {
            config.aspect_ratio = Some(request.aspect_ratio);
        }
    }

    // An empty prompt conflicts with other parameters on some configurations.
    let prompt = Some(request.prompt.clone()).filter(|p| !p.is_empty());

    ProviderPayload {
        model: request.model,
        prompt,
        image: None,
        video: None,
        config,
    }
}

fn attach_seed_image(payload: &mut ProviderPayload, seed_image: Option<&ImageInput>) -> Result<()> {
    let Some(image) = seed_image else {
        return Ok(());
    };
    if !payload.model.is_legacy() {
        tracing::debug!(model = %payload.model, "seed image ignored for non-legacy model");
        return Ok(());
    }
    tracing::debug!(image = image.display_name(), "generating with seed image");
    payload.image = Some(ImageAttachment::from_input(image)?);
    Ok(())
}

fn attach_frames(
    payload: &mut ProviderPayload,
    start_frame: Option<&ImageInput>,
    end_frame: Option<&ImageInput>,
    looping: bool,
) -> Result<()> {
    if let Some(start) = start_frame {
        tracing::debug!(image = start.display_name(), "generating with start frame");
        payload.image = Some(ImageAttachment::from_input(start)?);
    }

    let effective_end = if looping { start_frame } else { end_frame };
    if let Some(end) = effective_end {
        tracing::debug!(image = end.display_name(), looping, "generating with end frame");
        payload.config.last_frame = Some(ImageAttachment::from_input(end)?);
    }
    Ok(())
}

fn attach_references(
    payload: &mut ProviderPayload,
    reference_images: &[ImageInput],
    style_image: Option<&ImageInput>,
) -> Result<()> {
    let assets = reference_images
        .iter()
        .map(|img| (img, ReferenceType::Asset));
    let style = style_image.map(|img| (img, ReferenceType::Style));

    let references = assets
        .chain(style)
        .map(|(img, reference_type)| {
            tracing::debug!(image = img.display_name(), ?reference_type, "adding reference image");
            Ok(ReferenceImage {
                image: ImageAttachment::from_input(img)?,
                reference_type,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if !references.is_empty() {
        payload.config.reference_images = Some(references);
    }
    Ok(())
}

fn attach_video(payload: &mut ProviderPayload, video: Option<&VideoHandle>) -> Result<()> {
    let video = video.ok_or_else(|| {
        VeoStudioError::Validation("an input video is required to extend a video".into())
    })?;
    tracing::debug!(uri = video.uri().unwrap_or("<none>"), "extending video");
    payload.video = Some(video.clone());
    Ok(())
}

// ── REST wire format ────────────────────────────────────────────────────────

/// Body of a `predictLongRunning` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<WireImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<WireImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_images: Option<Vec<WireReferenceImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<WireVideo>,
}

/// REST image format: flat `bytesBase64Encoded` + `mimeType`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireReferenceImage {
    image: WireImage,
    reference_type: ReferenceType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireVideo {
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoded_video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
}

impl WireVideo {
    fn from_handle(handle: &VideoHandle) -> Self {
        Self {
            uri: handle.uri().map(str::to_string),
            encoded_video: handle.video_bytes().map(str::to_string),
            encoding: handle.mime_type().map(str::to_string),
        }
    }
}

/// REST parameters (uses `sampleCount` instead of `numberOfVideos`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    person_generation: Option<String>,
}

impl ProviderPayload {
    /// Lowers the payload to the REST `predictLongRunning` body.
    pub fn to_predict_request(&self) -> PredictRequest {
        let config = &self.config;
        let reference_images = config.reference_images.as_ref().map(|refs| {
            refs.iter()
                .map(|r| WireReferenceImage {
                    image: r.image.to_wire(),
                    reference_type: r.reference_type,
                })
                .collect()
        });

        PredictRequest {
            instances: vec![PredictInstance {
                prompt: self.prompt.clone(),
                image: self.image.as_ref().map(ImageAttachment::to_wire),
                last_frame: config.last_frame.as_ref().map(ImageAttachment::to_wire),
                reference_images,
                video: self.video.as_ref().map(WireVideo::from_handle),
            }],
            parameters: PredictParameters {
                sample_count: config.number_of_videos,
                aspect_ratio: config.aspect_ratio,
                resolution: config.resolution,
                duration_seconds: config.duration_seconds,
                person_generation: config.person_generation.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn png(tag: u8) -> ImageInput {
        ImageInput::new(
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, tag],
            "image/png",
        )
    }

    fn jpeg() -> ImageInput {
        ImageInput::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
    }

    #[test]
    fn test_base_payload_newer_model() {
        let req = GenerationRequest::text_to_video("Ocean waves")
            .with_model(VeoModel::Veo31)
            .with_resolution(Resolution::P1080)
            .with_aspect_ratio(AspectRatio::Portrait)
            .with_duration(5)
            .with_allow_people(true);
        let payload = build(&req).unwrap();

        assert_eq!(payload.model, VeoModel::Veo31);
        assert_eq!(payload.prompt.as_deref(), Some("Ocean waves"));
        assert_eq!(payload.config.number_of_videos, 1);
        assert_eq!(payload.config.resolution, Some(Resolution::P1080));
        assert_eq!(payload.config.aspect_ratio, Some(AspectRatio::Portrait));
        // Duration and person policy belong to the legacy shape only.
        assert_eq!(payload.config.duration_seconds, None);
        assert_eq!(payload.config.person_generation, None);
    }

    #[test]
    fn test_base_payload_legacy_model() {
        let req = GenerationRequest::text_to_video("Ocean waves")
            .with_model(VeoModel::Veo20)
            .with_duration(6)
            .with_allow_people(true);
        let payload = build(&req).unwrap();

        assert_eq!(payload.config.aspect_ratio, Some(AspectRatio::Landscape));
        assert_eq!(payload.config.duration_seconds, Some(6));
        assert_eq!(payload.config.person_generation.as_deref(), Some("allow_adult"));
        assert_eq!(payload.config.resolution, None);
    }

    #[test]
    fn test_legacy_people_not_allowed_omits_policy() {
        let req = GenerationRequest::text_to_video("x")
            .with_model(VeoModel::Veo20)
            .with_allow_people(false);
        assert_eq!(build(&req).unwrap().config.person_generation, None);
    }

    #[test]
    fn test_empty_prompt_never_sent() {
        let req = GenerationRequest::frames_to_video("", Some(png(1)), None);
        let payload = build(&req).unwrap();
        assert!(payload.prompt.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("prompt").is_none());

        let wire = serde_json::to_value(payload.to_predict_request()).unwrap();
        assert!(wire["instances"][0].get("prompt").is_none());
    }

    #[test]
    fn test_seed_image_only_for_legacy_model() {
        let req = GenerationRequest::text_to_video("x")
            .with_model(VeoModel::Veo20)
            .with_seed_image(png(1));
        let payload = build(&req).unwrap();
        assert_eq!(payload.image.as_ref().unwrap().mime_type, "image/png");

        let req = GenerationRequest::text_to_video("x")
            .with_model(VeoModel::Veo31)
            .with_seed_image(png(1));
        assert!(build(&req).unwrap().image.is_none());
    }

    #[test]
    fn test_frames_start_and_end() {
        let req = GenerationRequest::frames_to_video("x", Some(png(1)), Some(jpeg()));
        let payload = build(&req).unwrap();

        assert_eq!(payload.image.as_ref().unwrap().image_bytes, png(1).data);
        let last = payload.config.last_frame.as_ref().unwrap();
        assert_eq!(last.mime_type, "image/jpeg");
        assert_eq!(last.image_bytes, jpeg().data);
    }

    #[test]
    fn test_frames_looping_reuses_start_frame() {
        let req = GenerationRequest::frames_to_video("x", Some(png(7)), Some(jpeg())).with_looping(true);
        let payload = build(&req).unwrap();

        assert_eq!(payload.config.last_frame, payload.image);
        assert!(payload.image.is_some());
    }

    #[test]
    fn test_frames_looping_without_start_frame_attaches_nothing() {
        let req = GenerationRequest::frames_to_video("x", None, Some(jpeg())).with_looping(true);
        let payload = build(&req).unwrap();
        assert!(payload.image.is_none());
        assert!(payload.config.last_frame.is_none());
    }

    #[test]
    fn test_references_assets_then_style() {
        let req = GenerationRequest::references_to_video("x", vec![png(1), png(2)], Some(jpeg()));
        let refs = build(&req).unwrap().config.reference_images.unwrap();

        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].reference_type, ReferenceType::Asset);
        assert_eq!(refs[0].image.image_bytes, png(1).data);
        assert_eq!(refs[1].reference_type, ReferenceType::Asset);
        assert_eq!(refs[1].image.image_bytes, png(2).data);
        assert_eq!(refs[2].reference_type, ReferenceType::Style);
        assert_eq!(refs[2].image.mime_type, "image/jpeg");
    }

    #[test]
    fn test_references_without_style() {
        let req = GenerationRequest::references_to_video("x", vec![png(1)], None);
        let refs = build(&req).unwrap().config.reference_images.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].reference_type, ReferenceType::Asset);
    }

    #[test]
    fn test_references_empty_list_omitted() {
        let req = GenerationRequest::references_to_video("x", vec![], None);
        let payload = build(&req).unwrap();
        assert!(payload.config.reference_images.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["config"].get("referenceImages").is_none());
    }

    #[test]
    fn test_extend_requires_video_handle() {
        let req = GenerationRequest::extend_video("Continue", None);
        let err = build(&req).unwrap_err();
        assert!(err.is_validation(), "got {err:?}");
    }

    #[test]
    fn test_extend_passes_handle_verbatim_and_omits_aspect_ratio() {
        let handle = VideoHandle::new(json!({
            "uri": "https://provider.example/v1/files/abc",
            "mimeType": "video/mp4",
            "extra": {"kept": true}
        }));
        let req = GenerationRequest::extend_video("Continue", Some(handle.clone()))
            .with_model(VeoModel::Veo31);
        let payload = build(&req).unwrap();

        assert_eq!(payload.video.as_ref(), Some(&handle));
        assert_eq!(payload.config.aspect_ratio, None);
        assert_eq!(payload.config.resolution, Some(Resolution::P720));
    }

    #[test]
    fn test_extend_on_legacy_model_keeps_aspect_ratio() {
        let handle = VideoHandle::new(json!({"uri": "https://x/v"}));
        let req = GenerationRequest::extend_video("", Some(handle)).with_model(VeoModel::Veo20);
        let payload = build(&req).unwrap();
        assert_eq!(payload.config.aspect_ratio, Some(AspectRatio::Landscape));
    }

    #[test]
    fn test_empty_image_rejected() {
        let req = GenerationRequest::frames_to_video("x", Some(ImageInput::new(vec![], "image/png")), None);
        assert!(build(&req).unwrap_err().is_validation());

        let req = GenerationRequest::frames_to_video("x", Some(ImageInput::new(vec![1], " ")), None);
        assert!(build(&req).unwrap_err().is_validation());
    }

    #[test]
    fn test_sdk_payload_serializes_image_bytes_as_base64() {
        let req = GenerationRequest::frames_to_video("x", Some(ImageInput::new(vec![1, 2, 3], "image/png")), None);
        let json = serde_json::to_value(build(&req).unwrap()).unwrap();
        assert_eq!(json["image"]["imageBytes"], "AQID");
        assert_eq!(json["image"]["mimeType"], "image/png");
        assert_eq!(json["config"]["numberOfVideos"], 1);
        assert_eq!(json["model"], "veo-3.1-fast-generate-preview");
    }

    #[test]
    fn test_predict_request_wire_format() {
        let req = GenerationRequest::frames_to_video("Animate", Some(ImageInput::new(vec![1, 2, 3], "image/png")), Some(ImageInput::new(vec![4, 5, 6], "image/jpeg")))
            .with_aspect_ratio(AspectRatio::Portrait);
        let wire = serde_json::to_value(build(&req).unwrap().to_predict_request()).unwrap();

        let instance = &wire["instances"][0];
        assert_eq!(instance["prompt"], "Animate");
        assert_eq!(instance["image"]["bytesBase64Encoded"], "AQID");
        assert_eq!(instance["image"]["mimeType"], "image/png");
        assert_eq!(instance["lastFrame"]["bytesBase64Encoded"], "BAUG");
        assert_eq!(instance["lastFrame"]["mimeType"], "image/jpeg");

        let params = &wire["parameters"];
        assert_eq!(params["sampleCount"], 1);
        assert_eq!(params["aspectRatio"], "9:16");
        assert_eq!(params["resolution"], "720p");
        // Must use sampleCount, NOT numberOfVideos
        assert!(params.get("numberOfVideos").is_none());
    }

    #[test]
    fn test_predict_request_references_and_video() {
        let req = GenerationRequest::references_to_video("x", vec![ImageInput::new(vec![1, 2, 3], "image/png")], Some(ImageInput::new(vec![4, 5, 6], "image/jpeg")));
        let wire = serde_json::to_value(build(&req).unwrap().to_predict_request()).unwrap();
        let refs = wire["instances"][0]["referenceImages"].as_array().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0]["referenceType"], "asset");
        assert_eq!(refs[0]["image"]["bytesBase64Encoded"], "AQID");
        assert_eq!(refs[1]["referenceType"], "style");

        let handle = VideoHandle::new(json!({"uri": "https://x/v.mp4", "mimeType": "video/mp4"}));
        let req = GenerationRequest::extend_video("", Some(handle));
        let wire = serde_json::to_value(build(&req).unwrap().to_predict_request()).unwrap();
        let video = &wire["instances"][0]["video"];
        assert_eq!(video["uri"], "https://x/v.mp4");
        assert_eq!(video["encoding"], "video/mp4");
        assert!(video.get("encodedVideo").is_none());
        assert!(wire["instances"][0].get("image").is_none());
    }
}
