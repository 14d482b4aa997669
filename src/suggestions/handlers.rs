use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use tracing::{info, instrument};

use super::dto::{SuggestUpgradesInput, SuggestUpgradesOutput};
use super::services::suggest_for;
use crate::{error::ApiError, flows::FlowInvoker, state::AppState};

const SUGGEST_FAILED: &str =
    "Failed to generate protein suggestions. The AI model might be busy. Please try again later.";

pub fn routes() -> Router<AppState> {
    Router::new().route("/suggestions", post(suggest))
}

#[instrument(skip(flows, body), fields(pref = %body.dietary_preference))]
pub async fn suggest(
    State(flows): State<FlowInvoker>,
    WithRejection(Json(body), _): WithRejection<Json<SuggestUpgradesInput>, ApiError>,
) -> Result<Json<SuggestUpgradesOutput>, ApiError> {
    let suggestions = suggest_for(
        &flows,
        &body.meal_description,
        body.current_protein_grams,
        body.dietary_preference,
    )
    .await
    .map_err(|e| ApiError::from_flow(e, SUGGEST_FAILED))?;
    info!(count = suggestions.len(), "suggestions generated");
    Ok(Json(SuggestUpgradesOutput { suggestions }))
}
