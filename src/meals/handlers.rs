use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::{instrument, warn};

use super::dto::{AnalyzeMealRequest, FamilyAnalyzeRequest, FamilyMealReport, MealAnalysis};
use super::services::{analyze_family, analyze_meal};
use crate::{
    error::{ApiError, FlowError},
    flows::FlowInvoker,
    images::MealPhoto,
    state::AppState,
    suggestions::dto::DietaryPreference,
};

const ANALYZE_FAILED: &str =
    "Failed to analyze meal. The AI model might be busy. Please try again later.";
const FAMILY_FAILED: &str =
    "Failed to analyze the family meal. The AI model might be busy. Please try again later.";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals/analyze", post(analyze))
        .route("/meals/analyze/upload", post(analyze_upload))
        .route("/meals/analyze-family", post(analyze_family_meal))
}

/// POST /meals/analyze { photoDataUri, dietaryPreference }
#[instrument(skip(flows, body), fields(pref = %body.dietary_preference))]
pub async fn analyze(
    State(flows): State<FlowInvoker>,
    WithRejection(Json(body), _): WithRejection<Json<AnalyzeMealRequest>, ApiError>,
) -> Result<Json<MealAnalysis>, ApiError> {
    analyze_meal(&flows, &body)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_flow(e, ANALYZE_FAILED))
}

/// POST /meals/analyze/upload (multipart)
/// Fields: `photo` (file), `dietaryPreference` (text).
#[instrument(skip(flows, mp))]
pub async fn analyze_upload(
    State(flows): State<FlowInvoker>,
    mut mp: Multipart,
) -> Result<Json<MealAnalysis>, ApiError> {
    let mut photo: Option<MealPhoto> = None;
    let mut pref: Option<DietaryPreference> = None;

    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, "multipart read failed");
        ApiError::bad_request(e.body_text())
    })? {
        match field.name() {
            Some("photo") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                let parsed = MealPhoto::from_upload(data, &content_type)
                    .map_err(|e| ApiError::from_flow(FlowError::from(e), ANALYZE_FAILED))?;
                photo = Some(parsed);
            }
            Some("dietaryPreference") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                let parsed = serde_json::from_value(serde_json::Value::String(text.trim().into()))
                    .map_err(|_| {
                        ApiError::bad_request(format!(
                            "dietaryPreference must be one of: {}",
                            crate::suggestions::dto::DIETARY_PREFERENCE_TAGS.join(", ")
                        ))
                    })?;
                pref = Some(parsed);
            }
            _ => {}
        }
    }

    let photo = photo.ok_or_else(|| ApiError::bad_request("Image data is missing."))?;
    let dietary_preference =
        pref.ok_or_else(|| ApiError::bad_request("dietaryPreference is required."))?;

    let req = AnalyzeMealRequest {
        photo_data_uri: photo.to_data_uri(),
        dietary_preference,
    };
    analyze_meal(&flows, &req)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_flow(e, ANALYZE_FAILED))
}

/// POST /meals/analyze-family { photoDataUri, familyMembers: [{ name, dietaryPreference }] }
#[instrument(skip(flows, body), fields(members = body.family_members.len()))]
pub async fn analyze_family_meal(
    State(flows): State<FlowInvoker>,
    WithRejection(Json(body), _): WithRejection<Json<FamilyAnalyzeRequest>, ApiError>,
) -> Result<Json<FamilyMealReport>, ApiError> {
    analyze_family(&flows, &body)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_flow(e, FAMILY_FAILED))
}
