use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::{ApiError, FlowError},
    flows::{Field, FlowInvoker, Kind, PromptDefinition, Shape, Shaped},
    state::AppState,
};

pub const TRANSLATE_PROMPT: &str = "translateTextPrompt";

pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "Hindi",
    "Bengali",
    "Telugu",
    "Marathi",
    "Tamil",
    "Urdu",
    "Gujarati",
    "Kannada",
    "Odia",
    "Punjabi",
    "Malayalam",
];

const TRANSLATE_FAILED: &str =
    "Failed to translate text. The AI model might be busy. Please try again later.";

const TRANSLATE_TEMPLATE: &str = r#"Translate the following text into {{targetLanguage}}. Keep food names that are commonly said in English (like "paneer" or "dal") recognisable, keep all numbers and units unchanged, and return only the translation.

Text:
{{text}}
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateInput {
    pub text: String,
    pub target_language: String,
}

impl Shaped for TranslateInput {
    const SHAPE: &'static Shape = &Shape {
        name: "translateTextInput",
        fields: &[
            Field {
                name: "text",
                kind: Kind::String,
                required: true,
                description: "The text to translate.",
            },
            Field {
                name: "targetLanguage",
                kind: Kind::Enum(SUPPORTED_LANGUAGES),
                required: true,
                description: "The language to translate into.",
            },
        ],
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateOutput {
    pub translated_text: String,
}

impl Shaped for TranslateOutput {
    const SHAPE: &'static Shape = &Shape {
        name: "translateTextOutput",
        fields: &[Field {
            name: "translatedText",
            kind: Kind::String,
            required: true,
            description: "The translated text.",
        }],
    };
}

pub fn prompt() -> PromptDefinition {
    PromptDefinition::new(
        TRANSLATE_PROMPT,
        TRANSLATE_TEMPLATE,
        TranslateInput::SHAPE,
        TranslateOutput::SHAPE,
    )
}

pub async fn translate_text(
    flows: &FlowInvoker,
    input: &TranslateInput,
) -> Result<TranslateOutput, FlowError> {
    if input.text.trim().is_empty() {
        return Err(FlowError::InputMissing("No text to translate.".into()));
    }
    flows.invoke(TRANSLATE_PROMPT, input).await
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/translate", post(translate))
}

#[instrument(skip(flows, body), fields(lang = %body.target_language))]
pub async fn translate(
    State(flows): State<FlowInvoker>,
    WithRejection(Json(body), _): WithRejection<Json<TranslateInput>, ApiError>,
) -> Result<Json<TranslateOutput>, ApiError> {
    translate_text(&flows, &body)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_flow(e, TRANSLATE_FAILED))
}
