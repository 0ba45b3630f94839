//! Default transport: the provider endpoint, refreshed the way the SDK does.

use super::{check_status, submit_path, OperationTransport, TransportKind, API_KEY_HEADER};
use crate::error::Result;
use crate::video::operation::Operation;
use crate::video::request::PredictRequest;
use crate::video::types::VeoModel;
use async_trait::async_trait;

/// Base URL of the provider API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Talks to the provider API directly with the API key header.
///
/// Snapshots are normalized into the SDK shape (`generatedVideos`). Status
/// requests carry no cache-busting parameter.
pub struct DirectTransport {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl DirectTransport {
    /// Creates a transport against `api_base` (normally [`DEFAULT_API_BASE`]).
    pub fn new(client: reqwest::Client, api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn operation_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.api_base, name)
    }
}

#[async_trait]
impl OperationTransport for DirectTransport {
    async fn submit(&self, request: &PredictRequest, model: VeoModel) -> Result<Operation> {
        let url = format!("{}{}", self.api_base, submit_path(model));

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;
        let response = check_status(response, "failed to submit video generation").await?;

        let operation: Operation = response.json().await?;
        Ok(operation.into_sdk_shape())
    }

    async fn refresh(&self, operation: &Operation) -> Result<Operation> {
        let response = self
            .client
            .get(self.operation_url(&operation.name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let response = check_status(response, "failed to poll operation").await?;

        let snapshot: Operation = response.json().await?;
        Ok(snapshot.into_sdk_shape())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::request;
    use crate::video::types::GenerationRequest;
    use mockito::Server;

    #[tokio::test]
    async fn test_submit_sends_key_header_and_normalizes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning")
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"instances": [{"prompt": "Ocean waves"}], "parameters": {"sampleCount": 1}}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "models/veo/operations/op1"}"#)
            .expect(1)
            .create_async()
            .await;

        let transport = DirectTransport::new(reqwest::Client::new(), server.url(), "test-key");
        let payload = request::build(&GenerationRequest::text_to_video("Ocean waves")).unwrap();
        let op = transport
            .submit(&payload.to_predict_request(), payload.model)
            .await
            .unwrap();

        assert_eq!(op.name, "models/veo/operations/op1");
        assert!(!op.done);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_normalizes_raw_shape() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1beta/models/veo/operations/op1")
            .match_header("x-goog-api-key", "test-key")
            .match_query(mockito::Matcher::Missing)
            .with_status(200)
            .with_body(
                r#"{"name": "models/veo/operations/op1", "done": true,
                    "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://x/v.mp4"}}]}}}"#,
            )
            .create_async()
            .await;

        let transport = DirectTransport::new(reqwest::Client::new(), format!("{}/", server.url()), "test-key");
        let pending = Operation {
            name: "models/veo/operations/op1".into(),
            ..Default::default()
        };
        let op = transport.refresh(&pending).await.unwrap();

        assert!(op.done);
        let videos = op.response.unwrap().generated_videos.unwrap();
        assert_eq!(videos[0].video.as_ref().unwrap().uri(), Some("https://x/v.mp4"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1beta/operations/op1")
            .with_status(403)
            .with_body("Permission denied")
            .create_async()
            .await;

        let transport = DirectTransport::new(reqwest::Client::new(), server.url(), "test-key");
        let pending = Operation {
            name: "operations/op1".into(),
            ..Default::default()
        };
        let err = transport.refresh(&pending).await.unwrap_err();
        match err {
            crate::VeoStudioError::Api { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Permission denied"), "{message}");
            }
            other => panic!("Expected Api error, got: {other:?}"),
        }
    }
}
