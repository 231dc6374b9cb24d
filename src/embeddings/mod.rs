//! Embedding generation for note content.
//!
//! # Architecture
//!
//! - `remote`: OpenAI-compatible HTTP endpoints (OpenAI, Gemini, DeepSeek, SiliconFlow, custom)
//! - `local`: on-device models via fastembed
//! - `preprocess`: input cleanup before a request
//!
//! Providers are only used when notes are written or backfilled. Relatedness
//! itself works on the stored vectors and never calls a provider.

#[cfg(feature = "local-embeddings")]
mod local;
mod preprocess;
mod remote;

use std::path::Path;
use std::sync::Arc;

use crate::config::EmbeddingConfig;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbeddings;
pub use preprocess::preprocess_content;
pub use remote::{preset, resolve_endpoint, ProviderPreset, RemoteEmbeddings, PRESETS};

/// Text used to check that a provider is reachable
const PROBE_TEXT: &str = "hello";

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),

    #[error("Nothing to embed")]
    EmptyInput,
}

/// Turns text into a vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Provider and model, for logs.
    fn name(&self) -> &str;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Preprocesses `content` and embeds it.
pub fn embed_content(
    provider: &dyn EmbeddingProvider,
    content: &str,
) -> Result<Vec<f32>, EmbeddingError> {
    let input = preprocess_content(content).ok_or(EmbeddingError::EmptyInput)?;
    provider.embed(&input)
}

/// Embeds a fixed string and returns the vector dimensions.
pub fn probe(provider: &dyn EmbeddingProvider) -> Result<usize, EmbeddingError> {
    provider.embed(PROBE_TEXT).map(|v| v.len())
}

/// Builds the provider described by `config`.
///
/// Returns `Ok(None)` when a remote provider has no API key: notes are then
/// stored without embeddings, which is a supported state.
pub fn from_config(
    config: &EmbeddingConfig,
    base_path: &Path,
) -> Result<Option<Arc<dyn EmbeddingProvider>>, EmbeddingError> {
    if config.provider == "local" {
        return local_provider(config, base_path).map(Some);
    }

    if config.api_key.trim().is_empty() {
        log::debug!("no api key configured, embeddings disabled");
        return Ok(None);
    }

    Ok(Some(Arc::new(RemoteEmbeddings::new(config)?)))
}

#[cfg(feature = "local-embeddings")]
fn local_provider(
    config: &EmbeddingConfig,
    base_path: &Path,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    Ok(Arc::new(LocalEmbeddings::new(&config.model, base_path)?))
}

#[cfg(not(feature = "local-embeddings"))]
fn local_provider(
    _config: &EmbeddingConfig,
    _base_path: &Path,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    Err(EmbeddingError::NotConfigured(
        "built without the local-embeddings feature".to_string(),
    ))
}
