//! Error types for video generation runs.

use std::time::Duration;

/// Errors that can occur while generating a video.
///
/// Every variant is fatal for the current run. Callers that want to retry
/// re-invoke the whole generation with the same request.
#[derive(Debug, thiserror::Error)]
pub enum VeoStudioError {
    /// Request or credential failed validation before any network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Alternate endpoint string could not be normalized into a URL.
    #[error("invalid API endpoint: {0}")]
    InvalidEndpoint(String),

    /// Provider or proxy returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Status line plus response body.
        message: String,
    },

    /// Completed operation carried an error descriptor instead of a result.
    #[error("operation failed: {0}")]
    Provider(String),

    /// Completed operation produced nothing downloadable.
    #[error("no video produced: {0}")]
    EmptyResult(String),

    /// Response could not be interpreted.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Polling exceeded the configured timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (e.g., reading an input image or saving the video).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`VeoStudioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network call.
    Validation,
    /// A network exchange failed or returned something unusable.
    Transport,
    /// The provider reported the job as failed.
    Provider,
    /// The job finished without a usable video.
    EmptyResult,
}

/// Credential problems recognizable from provider error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialIssue {
    /// The key was rejected as malformed or unknown.
    InvalidKey,
    /// The key is valid but lacks access to the model.
    PermissionDenied,
    /// The model or project behind the key does not exist.
    EntityNotFound,
}

impl VeoStudioError {
    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidEndpoint(_) => ErrorKind::Validation,
            Self::Provider(_) => ErrorKind::Provider,
            Self::EmptyResult(_) => ErrorKind::EmptyResult,
            Self::Api { .. }
            | Self::UnexpectedResponse(_)
            | Self::Timeout(_)
            | Self::Network(_)
            | Self::Json(_)
            | Self::Io(_) => ErrorKind::Transport,
        }
    }

    /// Returns true if the error was raised before any network call.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Classifies credential-related failures from the error text.
    ///
    /// Intended for presentation layers that want to point the user at their
    /// API key; the orchestrator itself never branches on this.
    pub fn credential_issue(&self) -> Option<CredentialIssue> {
        let text = self.to_string();
        if text.contains("API_KEY_INVALID") || text.contains("API key not valid") {
            Some(CredentialIssue::InvalidKey)
        } else if text.to_lowercase().contains("permission denied") {
            Some(CredentialIssue::PermissionDenied)
        } else if text.contains("Requested entity was not found.") {
            Some(CredentialIssue::EntityNotFound)
        } else {
            None
        }
    }
}

/// Result type alias for video generation operations.
pub type Result<T> = std::result::Result<T, VeoStudioError>;
