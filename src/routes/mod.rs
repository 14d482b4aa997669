pub mod coach;
pub mod ingredients;
pub mod speech;
pub mod translate;

use axum::Router;

use crate::flows::PromptDefinition;
use crate::state::AppState;

pub fn prompts() -> Vec<PromptDefinition> {
    vec![coach::prompt(), ingredients::prompt(), translate::prompt()]
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(coach::routes())
        .merge(ingredients::routes())
        .merge(speech::routes())
        .merge(translate::routes())
}
