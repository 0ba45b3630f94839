//! Result resolver: locates, authenticates and downloads the generated video.

use crate::config::{ApiEndpoint, ProviderConfig};
use crate::error::{Result, VeoStudioError};
use crate::video::blob::ObjectUrlStore;
use crate::video::operation::{ArtifactList, Operation, OperationResponse};
use crate::video::transport::{check_status, redact_key};
use crate::video::types::{GeneratedArtifact, VideoHandle, VideoMetadata};
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// Query parameter carrying the API key on the default endpoint.
const KEY_PARAM: &str = "key";

const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Where and how to fetch the video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Final URL.
    pub url: Url,
    /// Bearer token to send, when the alternate endpoint is in use.
    pub bearer: Option<String>,
}

/// Resolves a completed operation into a downloaded, locally addressable video.
///
/// The bytes are registered in `objects`; the caller revokes the returned
/// object URL once the artifact is no longer needed.
pub async fn resolve(
    client: &reqwest::Client,
    objects: &ObjectUrlStore,
    operation: Operation,
    config: &ProviderConfig,
) -> Result<GeneratedArtifact> {
    let api_key = config.require_api_key()?;
    let endpoint = config.endpoint()?;
    let operation_name = operation.name.clone();

    let video = extract_video(operation)?;
    let original_uri = video
        .uri()
        .map(|uri| percent_decode_str(uri).decode_utf8_lossy().into_owned())
        .ok_or_else(|| VeoStudioError::EmptyResult("the generated video has no URI".into()))?;

    let download_url = download_url(&original_uri, endpoint.as_ref());
    let target = authorize(&download_url, api_key, endpoint.as_ref())?;
    tracing::info!(url = %redact_key(&target.url), "fetching generated video");

    let mut request = client.get(target.url.clone());
    if let Some(token) = &target.bearer {
        request = request.bearer_auth(token);
    }
    let response = check_status(request.send().await?, "failed to fetch video").await?;

    let mime_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| video.mime_type().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());
    let data = response.bytes().await?;
    tracing::debug!(bytes = data.len(), mime_type = %mime_type, "video downloaded");

    let object_url = objects.create(data.clone(), mime_type.clone());

    Ok(GeneratedArtifact {
        object_url,
        data,
        mime_type,
        download_url: target.url.to_string(),
        video,
        metadata: VideoMetadata {
            operation: Some(operation_name).filter(|n| !n.is_empty()),
            ..Default::default()
        },
    })
}

/// Extracts the first generated video's handle from a completed operation.
///
/// A `response` is used whenever present; the error descriptor is only
/// consulted when there is none.
pub fn extract_video(operation: Operation) -> Result<VideoHandle> {
    let response = match (operation.response, operation.error) {
        (Some(response), _) => response,
        (None, Some(err)) => return Err(VeoStudioError::Provider(err.describe())),
        (None, None) => return Err(VeoStudioError::EmptyResult("no video was generated".into())),
    };

    let first = ArtifactList::from_response(&response).and_then(ArtifactList::into_first);
    let Some(sample) = first else {
        return Err(empty_list_error(&response));
    };

    sample
        .video
        .filter(|v| v.uri().is_some())
        .ok_or_else(|| VeoStudioError::EmptyResult("the generated video has no URI".into()))
}

fn empty_list_error(response: &OperationResponse) -> VeoStudioError {
    let filtered = response
        .generate_video_response
        .as_ref()
        .filter(|raw| raw.rai_media_filtered_count.unwrap_or(0) > 0);

    match filtered {
        Some(raw) => {
            let reasons = raw
                .rai_media_filtered_reasons
                .as_ref()
                .map(|r| r.join("; "))
                .unwrap_or_default();
            let mut message = String::from("the video was removed by safety filters.");
            if !reasons.is_empty() {
                message.push(' ');
                message.push_str(&reasons);
            }
            VeoStudioError::EmptyResult(message)
        }
        None => VeoStudioError::EmptyResult("the operation returned no videos".into()),
    }
}

/// Reconstructs the download URL for the active endpoint.
///
/// With an alternate endpoint the original host is discarded and the
/// original path and query are appended to the endpoint's base URL. An
/// original URI that cannot be parsed is returned unchanged.
pub fn download_url(original_uri: &str, endpoint: Option<&ApiEndpoint>) -> String {
    let Some(endpoint) = endpoint else {
        return original_uri.to_string();
    };

    match Url::parse(original_uri) {
        Ok(original) => {
            let query = original.query().map(|q| format!("?{q}")).unwrap_or_default();
            let rewritten = format!("{}{}{}", endpoint.base_url(), original.path(), query);
            tracing::debug!(
                original = %redact_key(&original),
                endpoint = %endpoint,
                "rewrote download URL for alternate endpoint"
            );
            rewritten
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not parse video URI, using it unchanged");
            original_uri.to_string()
        }
    }
}

/// Applies endpoint-specific authentication to a download URL.
///
/// Alternate endpoint: bearer header, every `key` query parameter removed.
/// Default endpoint: `key` query parameter added if missing.
pub fn authorize(download_url: &str, api_key: &str, endpoint: Option<&ApiEndpoint>) -> Result<DownloadTarget> {
    let mut url = Url::parse(download_url).map_err(|e| {
        VeoStudioError::UnexpectedResponse(format!("invalid video download URL: {e}"))
    })?;

    if endpoint.is_some() {
        strip_query_param(&mut url, KEY_PARAM);
        return Ok(DownloadTarget {
            url,
            bearer: Some(api_key.to_string()),
        });
    }

    if !url.query_pairs().any(|(k, _)| k == KEY_PARAM) {
        url.query_pairs_mut().append_pair(KEY_PARAM, api_key);
    }
    Ok(DownloadTarget { url, bearer: None })
}

fn strip_query_param(url: &mut Url, name: &str) {
    if !url.query_pairs().any(|(k, _)| k == name) {
        return;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}
