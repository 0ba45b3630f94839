#![warn(missing_docs)]
//! Veo Studio - video generation orchestration for the Veo model family.
//!
//! A [`GenerationRequest`] is translated into the provider payload for its
//! mode, submitted as a long-running operation, polled until done, and the
//! resulting video is downloaded and registered under a local object URL.
//!
//! # Quick Start
//!
//! ```no_run
//! use veo_studio::{GenerationRequest, ProviderConfig, VeoStudio};
//!
//! #[tokio::main]
//! async fn main() -> veo_studio::Result<()> {
//!     let studio = VeoStudio::builder().build()?;
//!     let config = ProviderConfig::from_env();
//!     let request = GenerationRequest::text_to_video("A paper boat drifting down a rainy street");
//!     let video = studio.generate(&request, &config).await?;
//!     video.save("boat.mp4")?;
//!     studio.revoke(&video);
//!     Ok(())
//! }
//! ```
//!
//! # Extending a video
//!
//! ```no_run
//! # use veo_studio::{GenerationRequest, ProviderConfig, VeoStudio};
//! # async fn run(studio: VeoStudio, config: ProviderConfig, first: veo_studio::GeneratedArtifact) -> veo_studio::Result<()> {
//! let request = GenerationRequest::text_to_video("A paper boat").extension_of(first.video.clone());
//! let longer = studio.generate(&request.with_prompt("The boat reaches the sea"), &config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Endpoints
//!
//! By default jobs go to the provider API with the `x-goog-api-key` header.
//! Setting `VEO_API_ENDPOINT` (or [`ProviderConfig::with_endpoint`]) routes
//! submission, polling and download through an alternate endpoint with
//! bearer authentication and cache-busted status requests.
//!
//! # Features
//!
//! - `cli`: the `veo-studio` command-line interface (default)

mod error;

pub mod config;
pub mod video;

pub use config::{ApiEndpoint, ProviderConfig};
pub use error::{CredentialIssue, ErrorKind, Result, VeoStudioError};
pub use video::{
    generate_video, load_handle, AspectRatio, GeneratedArtifact, GenerationMode, GenerationRequest,
    ImageInput, MediaInputs, ObjectUrl, ObjectUrlStore, Resolution, VeoModel, VeoStudio,
    VeoStudioBuilder, VideoHandle, VideoMetadata,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ProviderConfig;
    pub use crate::error::{Result, VeoStudioError};
    pub use crate::video::{
        GeneratedArtifact, GenerationRequest, ImageInput, VeoModel, VeoStudio, VideoHandle,
    };
}
