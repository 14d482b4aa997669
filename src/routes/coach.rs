use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::{ApiError, FlowError},
    flows::{Field, FlowInvoker, Kind, PromptDefinition, Shape, Shaped},
    state::AppState,
    suggestions::{
        dto::{DietaryPreference, DIETARY_PREFERENCE_TAGS},
        services::tier_guidance,
    },
};

pub const COACH_PROMPT: &str = "cookingCoachPrompt";

const COACH_FAILED: &str =
    "Failed to get cooking tips. The AI model might be busy. Please try again later.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookingCoachInput {
    pub meal_description: String,
    pub dietary_preference: DietaryPreference,
}

impl Shaped for CookingCoachInput {
    const SHAPE: &'static Shape = &Shape {
        name: "cookingCoachInput",
        fields: &[
            Field {
                name: "mealDescription",
                kind: Kind::String,
                required: true,
                description: "A description of the meal the user is preparing.",
            },
            Field {
                name: "dietaryPreference",
                kind: Kind::Enum(DIETARY_PREFERENCE_TAGS),
                required: true,
                description: "The user's dietary preference.",
            },
        ],
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookingCoachOutput {
    pub tips: Vec<String>,
}

impl Shaped for CookingCoachOutput {
    const SHAPE: &'static Shape = &Shape {
        name: "cookingCoachOutput",
        fields: &[Field {
            name: "tips",
            kind: Kind::Array(&Kind::String),
            required: true,
            description: "A list of actionable, step-by-step tips to increase the protein content of the meal.",
        }],
    };
}

pub fn prompt() -> PromptDefinition {
    let tiers = DietaryPreference::ALL
        .into_iter()
        .map(tier_guidance)
        .collect::<Vec<_>>()
        .join("\n");
    let template = format!(
        r#"You are a "Cooking Coach" for DesiNutri, specializing in Indian cuisine. A user is currently preparing a meal and needs your help to make it more protein-rich.

User's Meal: "{{{{mealDescription}}}}"
Dietary Preference: "{{{{dietaryPreference}}}}"

Start with a short, friendly line and then give 3-5 simple, actionable, step-by-step tips they can apply *right now* while cooking. Tailor the tips to their dietary preference and use common, local Indian ingredients:
{tiers}

Focus on what they can add or change during the cooking process. For example, if they are making "dal tadka", suggest adding paneer cubes or a handful of roasted chana.

Example Output:
{{
  "tips": [
    "Great choice! While your dal is simmering, you can toss in 100g of crumbled paneer. It will absorb the flavors beautifully and add a great protein punch.",
    "Consider adding a handful of moong dal sprouts along with your other vegetables. They cook quickly and will increase the fiber and protein.",
    "For the tadka, instead of just spices, add a tablespoon of chopped peanuts or cashews. This will add a nice crunch and healthy fats along with protein."
  ]
}}
"#
    );
    PromptDefinition::new(
        COACH_PROMPT,
        template,
        CookingCoachInput::SHAPE,
        CookingCoachOutput::SHAPE,
    )
}

pub async fn coach_tips(
    flows: &FlowInvoker,
    input: &CookingCoachInput,
) -> Result<CookingCoachOutput, FlowError> {
    if input.meal_description.trim().is_empty() {
        return Err(FlowError::InputMissing(
            "Please describe the meal you are cooking.".into(),
        ));
    }
    flows.invoke(COACH_PROMPT, input).await
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/coach/tips", post(tips))
}

#[instrument(skip(flows, body), fields(pref = %body.dietary_preference))]
pub async fn tips(
    State(flows): State<FlowInvoker>,
    WithRejection(Json(body), _): WithRejection<Json<CookingCoachInput>, ApiError>,
) -> Result<Json<CookingCoachOutput>, ApiError> {
    coach_tips(&flows, &body)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_flow(e, COACH_FAILED))
}

#[cfg(test)]
mod coach_tests {
    use serde_json::json;

    use super::*;
    use crate::flows::test_invoker;
    use crate::genai::stub::StubModel;

    #[tokio::test]
    async fn returns_tips_in_order() {
        let stub = StubModel::new()
            .with_output(
                COACH_PROMPT,
                json!({ "tips": ["Add paneer cubes now.", "Finish with roasted chana."] }),
            )
            .into_arc();
        let flows = test_invoker(stub.clone());
        let out = coach_tips(
            &flows,
            &CookingCoachInput {
                meal_description: "dal tadka".into(),
                dietary_preference: DietaryPreference::Eggetarian,
            },
        )
        .await
        .unwrap();
        assert_eq!(out.tips, vec!["Add paneer cubes now.", "Finish with roasted chana."]);

        let text = stub.requests()[0].text();
        assert!(text.contains("User's Meal: \"dal tadka\""));
        assert!(text.contains("Dietary Preference: \"eggetarian\""));
        assert!(text.contains("\"tips\": ["));
    }

    #[tokio::test]
    async fn blank_description_is_rejected() {
        let stub = StubModel::new().into_arc();
        let flows = test_invoker(stub.clone());
        let err = coach_tips(
            &flows,
            &CookingCoachInput {
                meal_description: "".into(),
                dietary_preference: DietaryPreference::Veg,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlowError::InputMissing(_)));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn tips_must_be_strings() {
        let stub = StubModel::new()
            .with_output(COACH_PROMPT, json!({ "tips": [1, 2] }))
            .into_arc();
        let flows = test_invoker(stub);
        let err = coach_tips(
            &flows,
            &CookingCoachInput {
                meal_description: "upma".into(),
                dietary_preference: DietaryPreference::Veg,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlowError::ModelOutput(_)));
    }
}
