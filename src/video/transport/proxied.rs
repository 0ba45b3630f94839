//! Proxied transport: an alternate endpoint polled with cache-busted URLs.
//!
//! Intermediary proxies may cache GET responses for the operation status
//! URL, which would leave the client observing a stale "not done" forever.
//! Every status request therefore carries a fresh `_` query parameter.

use super::{check_status, redact_key, submit_path, OperationTransport, TransportKind, API_KEY_HEADER};
use crate::config::ApiEndpoint;
use crate::error::{Result, VeoStudioError};
use crate::video::operation::Operation;
use crate::video::request::PredictRequest;
use crate::video::types::VeoModel;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Query parameter carrying the cache-busting value.
pub const CACHE_BUST_PARAM: &str = "_";

/// Issues strictly increasing millisecond timestamps.
///
/// Two calls never return the same value, even within one millisecond or
/// across a backwards clock step.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    /// Creates a new cache buster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next value.
    pub fn next_value(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// Routes submission and polling through an alternate endpoint.
///
/// Requests authenticate with `Authorization: Bearer`. Snapshots are kept in
/// the raw REST shape.
pub struct ProxiedTransport {
    client: reqwest::Client,
    endpoint: ApiEndpoint,
    api_key: String,
    cache_buster: CacheBuster,
}

impl ProxiedTransport {
    /// Creates a transport for `endpoint`.
    pub fn new(client: reqwest::Client, endpoint: ApiEndpoint, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key: api_key.into(),
            cache_buster: CacheBuster::new(),
        }
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    /// Builds the status URL for `operation_name` with a fresh cache-busting value.
    pub fn status_url(&self, operation_name: &str) -> Result<Url> {
        let raw = format!("{}/v1beta/{}", self.endpoint.base_url(), operation_name);
        let mut url = Url::parse(&raw)
            .map_err(|e| VeoStudioError::UnexpectedResponse(format!("bad operation URL {raw}: {e}")))?;
        url.query_pairs_mut().append_pair(
            CACHE_BUST_PARAM,
            &self.cache_buster.next_value().to_string(),
        );
        Ok(url)
    }
}

#[async_trait]
impl OperationTransport for ProxiedTransport {
    async fn submit(&self, request: &PredictRequest, model: VeoModel) -> Result<Operation> {
        let url = format!("{}{}", self.endpoint.base_url(), submit_path(model));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;
        let response = check_status(response, "failed to submit video generation").await?;

        let operation: Operation = response.json().await?;
        Ok(operation.into_sdk_shape())
    }

    async fn refresh(&self, operation: &Operation) -> Result<Operation> {
        let url = self.status_url(&operation.name)?;
        tracing::debug!(url = %redact_key(&url), "polling operation through alternate endpoint");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = check_status(response, "operation polling failed").await?;

        let mut snapshot: Operation = response.json().await?;
        if snapshot.name.is_empty() {
            snapshot.name = operation.name.clone();
        }
        Ok(snapshot)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Proxied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn transport(base: &str) -> ProxiedTransport {
        ProxiedTransport::new(
            reqwest::Client::new(),
            ApiEndpoint::parse(base).unwrap(),
            "test-key",
        )
    }

    #[test]
    fn test_cache_buster_strictly_increasing() {
        let buster = CacheBuster::new();
        let mut previous = buster.next_value();
        for _ in 0..1000 {
            let next = buster.next_value();
            assert!(next > previous, "{next} <= {previous}");
            previous = next;
        }
    }

    #[test]
    fn test_status_url_never_reuses_cache_bust_value() {
        let transport = transport("https://proxy.example/api");
        let first = transport.status_url("operations/abc").unwrap();
        let second = transport.status_url("operations/abc").unwrap();

        assert_eq!(first.path(), "/api/v1beta/operations/abc");
        let bust = |url: &Url| {
            url.query_pairs()
                .find(|(k, _)| k == CACHE_BUST_PARAM)
                .map(|(_, v)| v.into_owned())
                .unwrap()
        };
        assert_ne!(bust(&first), bust(&second));
        assert_eq!(first.query_pairs().count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_uses_bearer_and_cache_bust() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/proxy/v1beta/operations/op2")
            .match_header("authorization", "Bearer test-key")
            .match_query(Matcher::Regex(r"^_=\d+$".to_string()))
            .with_status(200)
            .with_body(r#"{"name": "operations/op2", "done": true}"#)
            .expect(1)
            .create_async()
            .await;

        let transport = transport(&format!("{}/proxy", server.url()));
        let pending = Operation {
            name: "operations/op2".into(),
            ..Default::default()
        };
        let op = transport.refresh(&pending).await.unwrap();
        assert!(op.done);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_keeps_raw_shape_and_name() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1beta/operations/op3")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"done": true, "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://x/v.mp4"}}]}}}"#,
            )
            .create_async()
            .await;

        let transport = transport(&server.url());
        let pending = Operation {
            name: "operations/op3".into(),
            ..Default::default()
        };
        let op = transport.refresh(&pending).await.unwrap();

        assert_eq!(op.name, "operations/op3");
        let response = op.response.unwrap();
        assert!(response.generated_videos.is_none());
        assert!(response.generate_video_response.is_some());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_fatal() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1beta/operations/op4")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let transport = transport(&server.url());
        let pending = Operation {
            name: "operations/op4".into(),
            ..Default::default()
        };
        let err = transport.refresh(&pending).await.unwrap_err();
        assert!(matches!(err, VeoStudioError::Api { status: 502, .. }), "{err:?}");
        assert!(err.to_string().contains("bad gateway"));
    }
}
