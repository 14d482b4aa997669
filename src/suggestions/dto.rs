use serde::{Deserialize, Serialize};

use crate::flows::{Field, Kind, Shape, Shaped};

pub const DIETARY_PREFERENCE_TAGS: &[&str] = &["veg", "eggetarian", "non-veg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DietaryPreference {
    #[serde(rename = "veg")]
    Veg,
    #[serde(rename = "eggetarian")]
    Eggetarian,
    #[serde(rename = "non-veg")]
    NonVeg,
}

/// Ingredient families a dietary tier may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngredientCategory {
    Plant,
    Dairy,
    Egg,
    Meat,
    Fish,
}

impl IngredientCategory {
    pub const ALL: [IngredientCategory; 5] = [
        IngredientCategory::Plant,
        IngredientCategory::Dairy,
        IngredientCategory::Egg,
        IngredientCategory::Meat,
        IngredientCategory::Fish,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IngredientCategory::Plant => "plant-based foods (dals, legumes, soya, nuts, seeds, sprouts)",
            IngredientCategory::Dairy => "dairy (paneer, curd, milk)",
            IngredientCategory::Egg => "eggs",
            IngredientCategory::Meat => "chicken and other meats",
            IngredientCategory::Fish => "fish and seafood",
        }
    }
}

impl DietaryPreference {
    pub const ALL: [DietaryPreference; 3] = [
        DietaryPreference::Veg,
        DietaryPreference::Eggetarian,
        DietaryPreference::NonVeg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DietaryPreference::Veg => "veg",
            DietaryPreference::Eggetarian => "eggetarian",
            DietaryPreference::NonVeg => "non-veg",
        }
    }

    /// Tiers are cumulative: each one adds to the tier before it.
    pub fn permitted_categories(self) -> &'static [IngredientCategory] {
        use IngredientCategory::*;
        match self {
            DietaryPreference::Veg => &[Plant, Dairy],
            DietaryPreference::Eggetarian => &[Plant, Dairy, Egg],
            DietaryPreference::NonVeg => &[Plant, Dairy, Egg, Meat, Fish],
        }
    }

    pub fn permits(self, category: IngredientCategory) -> bool {
        self.permitted_categories().contains(&category)
    }

    pub fn forbidden_categories(self) -> Vec<IngredientCategory> {
        IngredientCategory::ALL
            .into_iter()
            .filter(|c| !self.permits(*c))
            .collect()
    }
}

impl std::fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSuggestion {
    pub suggestion: String,
    pub protein_grams: f64,
    pub carb_grams: f64,
    pub fat_grams: f64,
}

pub const UPGRADE_SUGGESTION_FIELDS: &[Field] = &[
    Field {
        name: "suggestion",
        kind: Kind::String,
        required: true,
        description: "The suggestion for a protein upgrade.",
    },
    Field {
        name: "proteinGrams",
        kind: Kind::Number { non_negative: true },
        required: true,
        description: "The amount of protein added in grams.",
    },
    Field {
        name: "carbGrams",
        kind: Kind::Number { non_negative: true },
        required: true,
        description: "The amount of carbs added in grams.",
    },
    Field {
        name: "fatGrams",
        kind: Kind::Number { non_negative: true },
        required: true,
        description: "The amount of fat added in grams.",
    },
];

/// Diet-aware suggestion input; also the body of `POST /suggestions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestUpgradesInput {
    pub meal_description: String,
    pub current_protein_grams: f64,
    pub dietary_preference: DietaryPreference,
}

impl Shaped for SuggestUpgradesInput {
    const SHAPE: &'static Shape = &Shape {
        name: "suggestProteinUpgradesInput",
        fields: &[
            Field {
                name: "mealDescription",
                kind: Kind::String,
                required: true,
                description: "A description of the meal for which to suggest protein upgrades.",
            },
            Field {
                name: "currentProteinGrams",
                kind: Kind::Number { non_negative: true },
                required: true,
                description: "The current amount of protein in the meal (in grams).",
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

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestVegUpgradesInput {
    pub meal_description: String,
    pub current_protein_grams: f64,
}

impl Shaped for SuggestVegUpgradesInput {
    const SHAPE: &'static Shape = &Shape {
        name: "suggestProteinUpgradesForVegInput",
        fields: &[
            Field {
                name: "mealDescription",
                kind: Kind::String,
                required: true,
                description: "A description of the meal for which to suggest protein upgrades.",
            },
            Field {
                name: "currentProteinGrams",
                kind: Kind::Number { non_negative: true },
                required: true,
                description: "The current amount of protein in the meal (in grams).",
            },
        ],
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestUpgradesOutput {
    pub suggestions: Vec<UpgradeSuggestion>,
}

impl Shaped for SuggestUpgradesOutput {
    const SHAPE: &'static Shape = &Shape {
        name: "suggestProteinUpgradesOutput",
        fields: &[Field {
            name: "suggestions",
            kind: Kind::Array(&Kind::Object(UPGRADE_SUGGESTION_FIELDS)),
            required: true,
            description: "Protein upgrades using local Indian ingredients, in order of recommendation.",
        }],
    };
}
