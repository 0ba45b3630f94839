//! Video generation: request building, operation polling and result resolution.

pub mod blob;
pub mod media;
pub mod operation;
mod orchestrator;
pub mod poller;
pub mod request;
pub mod resolver;
pub mod transport;
mod types;

pub use blob::{Blob, ObjectUrl, ObjectUrlStore};
pub use media::MediaFormat;
pub use operation::{ArtifactList, GeneratedSample, Operation, OperationError, OperationResponse};
pub use orchestrator::{generate_video, VeoStudio, VeoStudioBuilder};
pub use poller::{poll_until_done, DEFAULT_POLL_INTERVAL};
pub use request::{PredictRequest, ProviderPayload};
pub use transport::{OperationTransport, TransportKind};
pub use types::{
    load_handle, AspectRatio, GeneratedArtifact, GenerationMode, GenerationRequest, ImageInput,
    MediaInputs, Resolution, VeoModel, VideoHandle, VideoMetadata,
};
