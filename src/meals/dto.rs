use serde::{Deserialize, Serialize};

use crate::flows::{Field, Kind, Shape, Shaped};
use crate::suggestions::dto::{DietaryPreference, UpgradeSuggestion};

/// Macro-nutrients of a meal or ingredient. Energy is not cross-checked
/// against the other three.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroProfile {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub calories: f64,
}

pub const MACRO_PROFILE_FIELDS: &[Field] = &[
    Field {
        name: "protein",
        kind: Kind::Number { non_negative: true },
        required: true,
        description: "Protein content in grams.",
    },
    Field {
        name: "carbs",
        kind: Kind::Number { non_negative: true },
        required: true,
        description: "Carbohydrates content in grams.",
    },
    Field {
        name: "fat",
        kind: Kind::Number { non_negative: true },
        required: true,
        description: "Fat content in grams.",
    },
    Field {
        name: "calories",
        kind: Kind::Number { non_negative: true },
        required: true,
        description: "Total calories.",
    },
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePhotoInput {
    pub photo_data_uri: String,
}

impl Shaped for AnalyzePhotoInput {
    const SHAPE: &'static Shape = &Shape {
        name: "analyzeMealPhotoInput",
        fields: &[Field {
            name: "photoDataUri",
            kind: Kind::String,
            required: true,
            description: "A photo of a meal, as a data URI that must include a MIME type and use Base64 encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'.",
        }],
    };
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAnalysisOutput {
    pub meal_name: String,
    pub macros: MacroProfile,
}

impl Shaped for PhotoAnalysisOutput {
    const SHAPE: &'static Shape = &Shape {
        name: "analyzeMealPhotoOutput",
        fields: &[
            Field {
                name: "mealName",
                kind: Kind::String,
                required: true,
                description: "The name of the meal identified from the photo.",
            },
            Field {
                name: "macros",
                kind: Kind::Object(MACRO_PROFILE_FIELDS),
                required: true,
                description: "Nutritional breakdown of the whole plate.",
            },
        ],
    };
}

/// Identified meal plus its upgrade suggestions, in model order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    pub meal_name: String,
    pub macros: MacroProfile,
    pub protein_upgrade_suggestions: Vec<UpgradeSuggestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeMealRequest {
    pub photo_data_uri: String,
    pub dietary_preference: DietaryPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub name: String,
    pub dietary_preference: DietaryPreference,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyAnalyzeRequest {
    pub photo_data_uri: String,
    pub family_members: Vec<FamilyMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSuggestions {
    pub name: String,
    pub dietary_preference: DietaryPreference,
    pub suggestions: Vec<UpgradeSuggestion>,
}

/// Shared base analysis with one suggestion entry per member, in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMealReport {
    pub meal_name: String,
    pub base_macros: MacroProfile,
    pub family_suggestions: Vec<MemberSuggestions>,
}
