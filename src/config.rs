//! Per-call provider configuration: credential and optional alternate endpoint.

use crate::error::{Result, VeoStudioError};
use url::Url;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Secondary environment variable holding the API key.
pub const API_KEY_FALLBACK_ENV: &str = "GEMINI_API_KEY";
/// Environment variable holding the alternate endpoint.
pub const ENDPOINT_ENV: &str = "VEO_API_ENDPOINT";

/// Credential plus optional alternate network endpoint.
///
/// Supplied per generation call and never retained by the orchestrator.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    api_key: String,
    endpoint: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProviderConfig {
    /// Creates a config for the default provider endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: None,
        }
    }

    /// Routes every request through an alternate endpoint.
    ///
    /// Accepts a bare host (`proxy.example/api`) or a full URL. The string is
    /// validated when a generation starts, not here.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Reads `GOOGLE_API_KEY` (or `GEMINI_API_KEY`) and `VEO_API_ENDPOINT`.
    ///
    /// A missing key yields an empty credential, which is rejected at
    /// generation time like any other blank key.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .or_else(|_| std::env::var(API_KEY_FALLBACK_ENV))
            .unwrap_or_default();
        Self {
            api_key,
            endpoint: std::env::var(ENDPOINT_ENV).ok(),
        }
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the raw alternate endpoint string, if any.
    pub fn raw_endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Checks that the credential is present.
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(VeoStudioError::Validation(format!(
                "API key is required. Set {API_KEY_ENV} or pass one explicitly."
            )));
        }
        Ok(key)
    }

    /// Normalizes the alternate endpoint. Blank strings mean "none".
    pub fn endpoint(&self) -> Result<Option<ApiEndpoint>> {
        match self.endpoint.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => ApiEndpoint::parse(raw).map(Some),
        }
    }
}

/// A normalized alternate endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    url: Url,
}

impl ApiEndpoint {
    /// Parses a bare host or full URL, defaulting to `https` when no scheme is given.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VeoStudioError::InvalidEndpoint("endpoint is empty".into()));
        }

        let with_scheme = if raw.to_ascii_lowercase().starts_with("http") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| VeoStudioError::InvalidEndpoint(format!("{raw}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(VeoStudioError::InvalidEndpoint(format!(
                "{raw}: unsupported scheme {}",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(VeoStudioError::InvalidEndpoint(format!("{raw}: missing host")));
        }

        Ok(Self { url })
    }

    /// Host, port and path, without scheme or trailing slash (SDK transport form).
    pub fn sdk_host(&self) -> String {
        format!("{}{}", self.authority(), self.path())
    }

    /// Scheme, host, port and path without trailing slash.
    ///
    /// Used for submission, manual polling and download URL reconstruction.
    pub fn base_url(&self) -> String {
        format!("{}://{}{}", self.url.scheme(), self.authority(), self.path())
    }

    fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn path(&self) -> &str {
        self.url.path().trim_end_matches('/')
    }
}

impl std::fmt::Display for ApiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base_url())
    }
}
