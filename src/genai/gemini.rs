use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{GenAiError, GenerationClient, GenerationRequest, PromptPart, SafetySetting};
use crate::config::GenAiConfig;

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    tts_model: String,
    tts_voice: String,
}

impl GeminiClient {
    pub fn new(config: &GenAiConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("build http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
        })
    }

    async fn post(
        &self,
        model: &str,
        body: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GenAiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(GenAiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| GenAiError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, GenAiError> {
        let parts = request.parts.iter().map(Part::from).collect();
        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(&request.response_schema),
                response_modalities: None,
                speech_config: None,
            },
            safety_settings: request.safety_settings,
        };

        let response = self.post(&self.model, &body).await?;
        let candidate = response.first_candidate()?;
        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(GenAiError::Malformed(format!(
                "empty output (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        debug!(prompt = %request.prompt_name, bytes = text.len(), "model output received");
        serde_json::from_str(strip_fences(&text))
            .map_err(|e| GenAiError::Malformed(format!("output is not JSON: {}", e)))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Bytes, GenAiError> {
        let speech_config = json!({
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.tts_voice } }
        });
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(&["AUDIO"]),
                speech_config: Some(speech_config),
            },
            safety_settings: &[],
        };

        let response = self.post(&self.tts_model, &body).await?;
        let candidate = response.first_candidate()?;
        let inline = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.inline_data.as_ref())
            .ok_or_else(|| GenAiError::Malformed("no audio returned".into()))?;
        let pcm = STANDARD
            .decode(&inline.data)
            .map_err(|e| GenAiError::Malformed(format!("audio is not base64: {}", e)))?;
        debug!(
            mime = inline.mime_type.as_deref().unwrap_or("unknown"),
            bytes = pcm.len(),
            "speech received"
        );
        Ok(Bytes::from(pcm))
    }
}

/// Models occasionally wrap JSON in a markdown code fence.
fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// --- wire types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    safety_settings: &'a [SafetySetting],
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl From<&PromptPart> for Part {
    fn from(p: &PromptPart) -> Self {
        match p {
            PromptPart::Text(text) => Part::Text { text: text.clone() },
            PromptPart::Media { mime_type, data } => Part::Inline {
                inline_data: InlineData {
                    mime_type: mime_type.clone(),
                    data: STANDARD.encode(data),
                },
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<&'static [&'static str]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<Value>,
}

impl GenerateContentResponse {
    fn first_candidate(&self) -> Result<&Candidate, GenAiError> {
        self.candidates.first().ok_or_else(|| {
            let feedback = self
                .prompt_feedback
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "none".into());
            GenAiError::Malformed(format!("no candidates (prompt feedback: {})", feedback))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: Option<String>,
    data: String,
}
