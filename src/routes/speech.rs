use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::{ApiError, FlowError},
    flows::FlowInvoker,
    genai::GenerationClient,
    images::data_uri,
    state::AppState,
};

/// PCM layout returned by the speech model.
pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

const SPEECH_FAILED: &str =
    "Failed to generate audio. The AI model might be busy. Please try again later.";

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SpeechResponse {
    pub media: String,
}

/// Wraps raw little-endian PCM in a canonical 44-byte RIFF/WAVE header.
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16, bits: u16) -> Bytes {
    let block_align = channels * bits / 8;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = pcm.len() as u32;

    let mut buf = BytesMut::with_capacity(44 + pcm.len());
    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");
    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1);
    buf.put_u16_le(channels);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(bits);
    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(pcm);
    buf.freeze()
}

pub async fn narrate(model: &dyn GenerationClient, text: &str) -> Result<SpeechResponse, FlowError> {
    if text.trim().is_empty() {
        return Err(FlowError::InputMissing("No text to narrate.".into()));
    }
    let pcm = model.synthesize_speech(text).await?;
    debug!(pcm_bytes = pcm.len(), "speech synthesized");
    let wav = encode_wav(&pcm, SAMPLE_RATE, CHANNELS, BITS_PER_SAMPLE);
    Ok(SpeechResponse {
        media: data_uri("audio/wav", &wav),
    })
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/speech", post(speak))
}

#[instrument(skip(flows, body), fields(chars = body.text.len()))]
pub async fn speak(
    State(flows): State<FlowInvoker>,
    WithRejection(Json(body), _): WithRejection<Json<SpeechRequest>, ApiError>,
) -> Result<Json<SpeechResponse>, ApiError> {
    narrate(flows.model(), &body.text)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_flow(e, SPEECH_FAILED))
}
