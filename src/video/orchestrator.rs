//! Generation orchestrator: build, submit, poll, resolve.

use crate::config::ProviderConfig;
use crate::error::{Result, VeoStudioError};
use crate::video::blob::ObjectUrlStore;
use crate::video::poller::{poll_until_done, DEFAULT_POLL_INTERVAL};
use crate::video::request;
use crate::video::resolver;
use crate::video::transport::{DirectTransport, OperationTransport, ProxiedTransport, DEFAULT_API_BASE};
use crate::video::types::{GeneratedArtifact, GenerationRequest};
use std::time::{Duration, Instant};
use url::Url;

/// Builder for [`VeoStudio`].
#[derive(Debug, Clone)]
pub struct VeoStudioBuilder {
    client: Option<reqwest::Client>,
    api_base: String,
    poll_interval: Duration,
    timeout: Option<Duration>,
    object_urls: Option<ObjectUrlStore>,
}

impl Default for VeoStudioBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            object_urls: None,
        }
    }
}

impl VeoStudioBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Overrides the provider API base used when no alternate endpoint is configured.
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the delay between status checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets an upper bound on polling. Unbounded by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shares an object URL store with the caller.
    pub fn object_urls(mut self, store: ObjectUrlStore) -> Self {
        self.object_urls = Some(store);
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Result<VeoStudio> {
        let parsed = Url::parse(&self.api_base)
            .map_err(|e| VeoStudioError::InvalidEndpoint(format!("{}: {e}", self.api_base)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VeoStudioError::InvalidEndpoint(format!(
                "{}: unsupported scheme",
                self.api_base
            )));
        }

        Ok(VeoStudio {
            client: self.client.unwrap_or_default(),
            api_base: self.api_base,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
            object_urls: self.object_urls.unwrap_or_default(),
        })
    }
}

/// Runs video generations end to end.
#[derive(Debug, Clone)]
pub struct VeoStudio {
    client: reqwest::Client,
    api_base: String,
    poll_interval: Duration,
    timeout: Option<Duration>,
    object_urls: ObjectUrlStore,
}

impl VeoStudio {
    /// Creates a new `VeoStudioBuilder`.
    pub fn builder() -> VeoStudioBuilder {
        VeoStudioBuilder::new()
    }

    /// Returns the store holding downloaded videos.
    pub fn object_urls(&self) -> &ObjectUrlStore {
        &self.object_urls
    }

    /// Generates a video for `request`.
    ///
    /// Configuration and request problems are reported before any network
    /// call. An alternate endpoint in `config` routes the whole job through
    /// the proxied transport.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        config: &ProviderConfig,
    ) -> Result<GeneratedArtifact> {
        let api_key = config.require_api_key()?;
        let endpoint = config.endpoint()?;
        let payload = request::build(request)?;
        let model = payload.model;

        let transport: Box<dyn OperationTransport> = match endpoint {
            Some(endpoint) => {
                tracing::info!(endpoint = %endpoint, "using alternate endpoint");
                Box::new(ProxiedTransport::new(self.client.clone(), endpoint, api_key))
            }
            None => Box::new(DirectTransport::new(
                self.client.clone(),
                self.api_base.as_str(),
                api_key,
            )),
        };

        let start = Instant::now();
        tracing::info!(
            model = %model,
            mode = %request.mode(),
            transport = %transport.kind(),
            "submitting video generation"
        );
        let operation = transport
            .submit(&payload.to_predict_request(), model)
            .await?;
        tracing::info!(operation = %operation.name, "video generation submitted");

        let operation = poll_until_done(
            transport.as_ref(),
            operation,
            self.poll_interval,
            self.timeout,
        )
        .await?;
        let operation_name = operation.name.clone();

        let mut artifact = resolver::resolve(&self.client, &self.object_urls, operation, config).await?;

        artifact.metadata.model = Some(model.as_str().to_string());
        artifact.metadata.duration_ms = Some(start.elapsed().as_millis() as u64);
        if artifact.metadata.operation.is_none() && !operation_name.is_empty() {
            artifact.metadata.operation = Some(operation_name);
        }

        tracing::info!(
            bytes = artifact.size(),
            duration_ms = ?artifact.metadata.duration_ms,
            object_url = %artifact.object_url,
            "video generation complete"
        );
        Ok(artifact)
    }

    /// Releases the object URL held by `artifact`.
    pub fn revoke(&self, artifact: &GeneratedArtifact) -> bool {
        self.object_urls.revoke(&artifact.object_url)
    }
}

/// Generates a video with default settings.
pub async fn generate_video(
    request: &GenerationRequest,
    config: &ProviderConfig,
) -> Result<GeneratedArtifact> {
    VeoStudio::builder().build()?.generate(request, config).await
}
