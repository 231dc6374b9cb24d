//! OpenAI-compatible `/embeddings` endpoint client.
//!
//! Works with any provider that speaks the OpenAI embeddings API. Presets
//! cover the common ones so only an API key has to be configured.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{EmbeddingError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

/// Fallback API root when neither config nor preset provide one
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Fallback model when neither config nor preset provide one
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Known OpenAI-compatible embedding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPreset {
    pub name: &'static str,
    pub label: &'static str,
    pub base_url: &'static str,
    pub model: &'static str,
}

pub const PRESETS: [ProviderPreset; 4] = [
    ProviderPreset {
        name: "openai",
        label: "OpenAI",
        base_url: "https://api.openai.com/v1",
        model: "text-embedding-3-small",
    },
    ProviderPreset {
        name: "gemini",
        label: "Google Gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
        model: "text-embedding-004",
    },
    ProviderPreset {
        name: "deepseek",
        label: "DeepSeek",
        base_url: "https://api.deepseek.com/v1",
        model: "deepseek-embedding",
    },
    ProviderPreset {
        name: "siliconflow",
        label: "SiliconFlow",
        base_url: "https://api.siliconflow.cn/v1",
        model: "BAAI/bge-m3",
    },
];

pub fn preset(name: &str) -> Option<&'static ProviderPreset> {
    PRESETS.iter().find(|p| p.name == name)
}

/// Endpoint URL and model after applying preset and global fallbacks.
pub fn resolve_endpoint(config: &EmbeddingConfig) -> (String, String) {
    let preset = preset(&config.provider);

    let base_url = Some(config.base_url.trim())
        .filter(|url| !url.is_empty())
        .or(preset.map(|p| p.base_url))
        .unwrap_or(DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string();

    let model = Some(config.model.trim())
        .filter(|model| !model.is_empty())
        .or(preset.map(|p| p.model))
        .unwrap_or(DEFAULT_MODEL)
        .to_string();

    (base_url, model)
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

pub struct RemoteEmbeddings {
    client: reqwest::blocking::Client,
    name: String,
    url: String,
    api_key: String,
    model: String,
}

impl RemoteEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.api_key.trim().is_empty() {
            return Err(EmbeddingError::NotConfigured(
                "embedding.api_key is empty".to_string(),
            ));
        }

        let (base_url, model) = resolve_endpoint(config);
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            name: format!("{}:{model}", config.provider),
            url: format!("{base_url}/embeddings"),
            api_key: config.api_key.trim().to_string(),
            model,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl EmbeddingProvider for RemoteEmbeddings {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        log::debug!("requesting embedding from {} model={}", self.url, self.model);

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.json::<ApiErrorBody>().unwrap_or_default();
            let message = body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            log::warn!("embedding request failed: status={status} message={message}");
            return Err(EmbeddingError::Api(message));
        }

        let body: EmbeddingResponse = resp.json()?;
        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".to_string()))?;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "empty embedding returned".to_string(),
            ));
        }

        Ok(embedding)
    }
}
