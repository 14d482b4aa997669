use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::genai::GenAiError;
use crate::images::PhotoError;

/// Failure of a flow or of an orchestration built on flows.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// A required value is absent or empty; raised before any model call.
    #[error("{0}")]
    InputMissing(String),
    /// The input does not match the prompt's declared input shape.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The model answered, but not in the declared output shape.
    #[error("model output rejected: {0}")]
    ModelOutput(String),
    #[error("model call failed: {0:#}")]
    Upstream(anyhow::Error),
    #[error("unknown prompt '{0}'")]
    UnknownPrompt(String),
}

impl FlowError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, FlowError::InputMissing(_) | FlowError::Validation(_))
    }
}

impl From<GenAiError> for FlowError {
    fn from(e: GenAiError) -> Self {
        match e {
            GenAiError::Malformed(detail) => FlowError::ModelOutput(detail),
            other => FlowError::Upstream(other.into()),
        }
    }
}

impl From<PhotoError> for FlowError {
    fn from(e: PhotoError) -> Self {
        match e {
            PhotoError::Missing => FlowError::InputMissing(e.to_string()),
            other => FlowError::Validation(other.to_string()),
        }
    }
}

/// Error body returned by every handler: `{ "error": "<message>" }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    /// Input problems are surfaced verbatim; anything else is logged and
    /// replaced by `failure`.
    pub fn from_flow(err: FlowError, failure: &'static str) -> Self {
        if err.is_client_error() {
            warn!(error = %err, "request rejected");
            return Self::bad_request(err.to_string());
        }
        error!(error = %err, "flow failed");
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: failure.to_string(),
        }
    }
}

/// Malformed bodies, missing fields and unknown enum tags.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        warn!(error = %message, "request body rejected");
        Self::bad_request(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let api = ApiError::from_flow(
            FlowError::InputMissing("Image data is missing.".into()),
            "Failed to analyze meal.",
        );
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, "Image data is missing.");
    }

    #[test]
    fn upstream_errors_are_hidden() {
        let api = ApiError::from_flow(
            FlowError::ModelOutput("macros.protein: expected number".into()),
            "Failed to analyze meal. Please try again later.",
        );
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.message, "Failed to analyze meal. Please try again later.");
    }

    #[test]
    fn malformed_model_response_is_model_output_error() {
        let e: FlowError = GenAiError::Malformed("not json".into()).into();
        assert!(matches!(e, FlowError::ModelOutput(_)));
        let e: FlowError = GenAiError::Status {
            status: 429,
            body: "quota".into(),
        }
        .into();
        assert!(matches!(e, FlowError::Upstream(_)));
    }

    #[test]
    fn photo_errors_split_into_missing_and_invalid() {
        assert!(matches!(
            FlowError::from(PhotoError::Missing),
            FlowError::InputMissing(_)
        ));
        assert!(matches!(
            FlowError::from(PhotoError::NotDataUri),
            FlowError::Validation(_)
        ));
    }
}
