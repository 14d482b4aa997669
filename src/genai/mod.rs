mod gemini;
#[cfg(test)]
pub mod stub;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

/// One piece of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Media { mime_type: String, data: Bytes },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt_name: String,
    pub parts: Vec<PromptPart>,
    pub response_schema: Value,
    pub safety_settings: &'static [SafetySetting],
}

impl GenerationRequest {
    /// Concatenated text parts, media omitted.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                PromptPart::Text(t) => Some(t.as_str()),
                PromptPart::Media { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    #[error("request to model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// The hosted generation capability. Implementations make exactly one
/// outbound call per method invocation.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Returns a JSON value produced under `request.response_schema`.
    async fn generate(&self, request: GenerationRequest) -> Result<Value, GenAiError>;

    /// Returns raw 16-bit little-endian mono PCM at 24 kHz.
    async fn synthesize_speech(&self, text: &str) -> Result<Bytes, GenAiError>;
}
