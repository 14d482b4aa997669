use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::{ApiError, FlowError},
    flows::{Field, FlowInvoker, Kind, PromptDefinition, Shape, Shaped},
    meals::dto::{MacroProfile, MACRO_PROFILE_FIELDS},
    state::AppState,
};

pub const LOOKUP_PROMPT: &str = "ingredientLookupPrompt";

const LOOKUP_FAILED: &str =
    "Failed to look up the ingredient. The AI model might be busy. Please try again later.";

const LOOKUP_TEMPLATE: &str = r#"You are a nutrition database for Indian kitchens. Give the nutritional information for a common serving of "{{ingredientName}}".

Use a serving size that an Indian home cook would recognise (for example "1 katori (150g)", "100g" or "2 rotis") and report protein, carbs, fat and calories for exactly that serving. If the ingredient is ambiguous, pick the most common Indian preparation and mention it in the notes.
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLookupInput {
    pub ingredient_name: String,
}

impl Shaped for IngredientLookupInput {
    const SHAPE: &'static Shape = &Shape {
        name: "ingredientLookupInput",
        fields: &[Field {
            name: "ingredientName",
            kind: Kind::String,
            required: true,
            description: "The name of the ingredient to look up.",
        }],
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLookupOutput {
    pub serving_size: String,
    pub macros: MacroProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Shaped for IngredientLookupOutput {
    const SHAPE: &'static Shape = &Shape {
        name: "ingredientLookupOutput",
        fields: &[
            Field {
                name: "servingSize",
                kind: Kind::String,
                required: true,
                description: "The serving size the macros refer to.",
            },
            Field {
                name: "macros",
                kind: Kind::Object(MACRO_PROFILE_FIELDS),
                required: true,
                description: "Nutritional breakdown of one serving.",
            },
            Field {
                name: "notes",
                kind: Kind::String,
                required: false,
                description: "Short remarks about the preparation assumed.",
            },
        ],
    };
}

pub fn prompt() -> PromptDefinition {
    PromptDefinition::new(
        LOOKUP_PROMPT,
        LOOKUP_TEMPLATE,
        IngredientLookupInput::SHAPE,
        IngredientLookupOutput::SHAPE,
    )
}

pub async fn lookup_ingredient(
    flows: &FlowInvoker,
    input: &IngredientLookupInput,
) -> Result<IngredientLookupOutput, FlowError> {
    if input.ingredient_name.trim().is_empty() {
        return Err(FlowError::InputMissing("Ingredient name is missing.".into()));
    }
    flows.invoke(LOOKUP_PROMPT, input).await
}

/// Protein per rupee for a fixed list of everyday sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinSource {
    pub name: &'static str,
    pub protein: f64,
    pub price: f64,
    pub serving_size: &'static str,
    pub protein_per_rupee: f64,
}

// (name, protein g, price INR, serving)
const PROTEIN_SOURCES: &[(&str, f64, f64, &str)] = &[
    ("Soya Chunks", 52.0, 20.0, "100g"),
    ("Peanuts", 26.0, 15.0, "100g"),
    ("Moong Dal", 24.0, 18.0, "100g"),
    ("Chana Dal", 25.0, 20.0, "100g"),
    ("Eggs", 36.0, 42.0, "6 large eggs (~300g)"),
    ("Paneer", 20.0, 70.0, "200g"),
    ("Tofu", 8.0, 45.0, "200g"),
    ("Chicken Breast", 31.0, 120.0, "250g"),
    ("Greek Yogurt", 10.0, 50.0, "1 cup (200g)"),
    ("Milk", 3.4, 25.0, "500ml"),
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Best value first.
pub fn protein_per_rupee() -> Vec<ProteinSource> {
    let mut ranked: Vec<ProteinSource> = PROTEIN_SOURCES
        .iter()
        .map(|&(name, protein, price, serving_size)| ProteinSource {
            name,
            protein,
            price,
            serving_size,
            protein_per_rupee: round2(protein / price),
        })
        .collect();
    ranked.sort_by(|a, b| b.protein_per_rupee.total_cmp(&a.protein_per_rupee));
    ranked
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients/lookup", post(lookup))
        .route("/ingredients/protein-per-rupee", get(ranking))
}

#[instrument(skip(flows, body), fields(ingredient = %body.ingredient_name))]
pub async fn lookup(
    State(flows): State<FlowInvoker>,
    WithRejection(Json(body), _): WithRejection<Json<IngredientLookupInput>, ApiError>,
) -> Result<Json<IngredientLookupOutput>, ApiError> {
    lookup_ingredient(&flows, &body)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_flow(e, LOOKUP_FAILED))
}

pub async fn ranking() -> Json<Vec<ProteinSource>> {
    Json(protein_per_rupee())
}
