pub mod gemini;

use futures::future::BoxFuture;
use shared::{MediaKind, RawResponse};
use std::path::PathBuf;

pub use gemini::GeminiClient;

/// Media handed to the model. `path` is only valid while the caller's scoped upload is alive.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub kind: MediaKind,
    pub mime_type: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelInvocationError {
    #[error("Missing model credential: environment variable {0} is not set")]
    MissingCredential(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model returned status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("Model returned no candidates")]
    EmptyResponse,
    #[error("Failed to read media: {0}")]
    Media(#[from] std::io::Error),
}

/// The multimodal model: instruction plus media in, natural-language response out.
pub trait ModelClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        instruction: &'a str,
        media: &'a MediaPayload,
    ) -> BoxFuture<'a, Result<RawResponse, ModelInvocationError>>;
}
