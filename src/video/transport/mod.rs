//! Operation transports.
//!
//! A transport submits a job and refreshes its status. The default transport
//! talks to the provider like its SDK does; the proxied transport polls an
//! alternate endpoint manually with a cache-busting parameter.

mod direct;
mod proxied;

pub use direct::{DirectTransport, DEFAULT_API_BASE};
pub use proxied::{CacheBuster, ProxiedTransport, CACHE_BUST_PARAM};

use crate::error::{Result, VeoStudioError};
use crate::video::operation::Operation;
use crate::video::request::PredictRequest;
use crate::video::types::VeoModel;
use async_trait::async_trait;
use url::Url;

/// Header carrying the API key on provider requests.
pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

/// Which transport drives an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Provider endpoint, SDK-style refresh.
    Direct,
    /// Alternate endpoint, manual cache-busted refresh.
    Proxied,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Proxied => write!(f, "proxied"),
        }
    }
}

/// Submits generation jobs and refreshes their status.
#[async_trait]
pub trait OperationTransport: Send + Sync {
    /// Submits a job and returns the initial operation snapshot.
    async fn submit(&self, request: &PredictRequest, model: VeoModel) -> Result<Operation>;

    /// Fetches a fresh snapshot of `operation`.
    async fn refresh(&self, operation: &Operation) -> Result<Operation>;

    /// Returns the kind of this transport.
    fn kind(&self) -> TransportKind;
}

/// Path of the `predictLongRunning` call for `model`, relative to an API base.
pub(crate) fn submit_path(model: VeoModel) -> String {
    format!("/v1beta/models/{}:predictLongRunning", model.as_str())
}

/// Turns a non-success response into [`VeoStudioError::Api`].
pub(crate) async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(VeoStudioError::Api {
        status: status.as_u16(),
        message: format!(
            "{context}: {} {}. {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            body.trim()
        ),
    })
}

/// Renders a URL for logs with any `key` parameter masked.
pub(crate) fn redact_key(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "key") {
        return url.to_string();
    }
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_path() {
        assert_eq!(
            submit_path(VeoModel::Veo20),
            "/v1beta/models/veo-2.0-generate-001:predictLongRunning"
        );
    }

    #[test]
    fn test_redact_key() {
        let url = Url::parse("https://x.example/v1/files/a?alt=media&key=secret").unwrap();
        let redacted = redact_key(&url);
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("alt=media"));
        assert!(redacted.contains("key=REDACTED"));

        let url = Url::parse("https://x.example/v1/files/a").unwrap();
        assert_eq!(redact_key(&url), "https://x.example/v1/files/a");
    }
}
