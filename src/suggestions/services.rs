use tracing::debug;

use super::dto::{
    DietaryPreference, IngredientCategory, SuggestUpgradesInput, SuggestUpgradesOutput, SuggestVegUpgradesInput,
    UpgradeSuggestion,
};
use crate::error::FlowError;
use crate::flows::{FlowInvoker, PromptDefinition, Shaped};

pub const DIET_AWARE_PROMPT: &str = "suggestProteinUpgradesPrompt";
pub const VEG_ONLY_PROMPT: &str = "suggestProteinUpgradesForVegPrompt";

const DIET_AWARE_EXAMPLES: &str = r#"Example Output for 'non-veg':
{
  "suggestions": [
    { "suggestion": "Add 100g of grilled chicken breast", "proteinGrams": 31, "carbGrams": 0, "fatGrams": 4 },
    { "suggestion": "Add 2 boiled eggs", "proteinGrams": 12, "carbGrams": 1, "fatGrams": 10 },
    { "suggestion": "Mix in 100g of paneer", "proteinGrams": 20, "carbGrams": 4, "fatGrams": 22 }
  ]
}

Example Output for 'eggetarian':
{
  "suggestions": [
    { "suggestion": "Add 2 boiled eggs", "proteinGrams": 12, "carbGrams": 1, "fatGrams": 10 },
    { "suggestion": "Add 100g of paneer", "proteinGrams": 20, "carbGrams": 4, "fatGrams": 22 },
    { "suggestion": "Mix in a cup of boiled chickpeas", "proteinGrams": 15, "carbGrams": 45, "fatGrams": 4 }
  ]
}
"#;

const VEG_ONLY_EXAMPLES: &str = r#"Example Output:
{
  "suggestions": [
    { "suggestion": "Add 100g of paneer", "proteinGrams": 20, "carbGrams": 4, "fatGrams": 22 },
    { "suggestion": "Sprinkle 2 tablespoons of roasted chana dal", "proteinGrams": 7, "carbGrams": 12, "fatGrams": 2 },
    { "suggestion": "Mix in a cup of boiled chickpeas", "proteinGrams": 15, "carbGrams": 45, "fatGrams": 4 }
  ]
}
"#;

fn labels(categories: &[IngredientCategory]) -> String {
    categories
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per tier, generated from the category table so the prompt
/// wording cannot drift from `DietaryPreference::permitted_categories`.
pub(crate) fn tier_guidance(pref: DietaryPreference) -> String {
    let forbidden = pref.forbidden_categories();
    if forbidden.is_empty() {
        format!(
            "- For '{}': you may use {}.",
            pref,
            labels(pref.permitted_categories())
        )
    } else {
        format!(
            "- For '{}': use ONLY {}. Never suggest {}.",
            pref,
            labels(pref.permitted_categories()),
            labels(&forbidden)
        )
    }
}

pub fn prompts() -> Vec<PromptDefinition> {
    let tiers = DietaryPreference::ALL
        .into_iter()
        .map(tier_guidance)
        .collect::<Vec<_>>()
        .join("\n");

    let diet_aware = format!(
        r#"You are a nutritionist specializing in Indian cuisine. A user has described their meal as "{{{{mealDescription}}}}" which contains {{{{currentProteinGrams}}}} grams of protein. Their dietary preference is {{{{dietaryPreference}}}}.

Suggest some simple and actionable ways to increase the protein content of their meal using local Indian ingredients that respect their dietary preference:
{tiers}

Only suggest ingredients that can realistically be added to the meal as described. For each suggestion, provide the added protein, carbs, and fat in grams. List the suggestions in the order you recommend them.

{DIET_AWARE_EXAMPLES}"#
    );

    let veg = DietaryPreference::Veg;
    let veg_only = format!(
        r#"You are a nutritionist specializing in Indian vegetarian cuisine. A user has described their meal as "{{{{mealDescription}}}}" which contains {{{{currentProteinGrams}}}} grams of protein. Suggest some simple and actionable ways to increase the protein content of their meal using ONLY VEGETARIAN local Indian ingredients: {allowed}. Never suggest {forbidden}.

Only suggest ingredients that can realistically be added to the meal as described. For each suggestion, provide the added protein, carbs, and fat in grams. List the suggestions in the order you recommend them.

{VEG_ONLY_EXAMPLES}"#,
        allowed = labels(veg.permitted_categories()),
        forbidden = labels(&veg.forbidden_categories()),
    );

    vec![
        PromptDefinition::new(
            DIET_AWARE_PROMPT,
            diet_aware,
            SuggestUpgradesInput::SHAPE,
            SuggestUpgradesOutput::SHAPE,
        ),
        PromptDefinition::new(
            VEG_ONLY_PROMPT,
            veg_only,
            SuggestVegUpgradesInput::SHAPE,
            SuggestUpgradesOutput::SHAPE,
        ),
    ]
}

fn require_description(meal_description: &str) -> Result<(), FlowError> {
    if meal_description.trim().is_empty() {
        return Err(FlowError::InputMissing(
            "Meal description is missing.".into(),
        ));
    }
    Ok(())
}

/// Diet-aware variant covering all three tiers.
pub async fn suggest_upgrades(
    flows: &FlowInvoker,
    input: &SuggestUpgradesInput,
) -> Result<Vec<UpgradeSuggestion>, FlowError> {
    require_description(&input.meal_description)?;
    let out: SuggestUpgradesOutput = flows.invoke(DIET_AWARE_PROMPT, input).await?;
    Ok(out.suggestions)
}

/// Vegetarian-only variant.
pub async fn suggest_veg_upgrades(
    flows: &FlowInvoker,
    input: &SuggestVegUpgradesInput,
) -> Result<Vec<UpgradeSuggestion>, FlowError> {
    require_description(&input.meal_description)?;
    let out: SuggestUpgradesOutput = flows.invoke(VEG_ONLY_PROMPT, input).await?;
    Ok(out.suggestions)
}

/// Picks the variant for `pref`: `veg` goes to the vegetarian-only flow,
/// the other tiers to the diet-aware flow.
pub async fn suggest_for(
    flows: &FlowInvoker,
    meal_description: &str,
    current_protein_grams: f64,
    pref: DietaryPreference,
) -> Result<Vec<UpgradeSuggestion>, FlowError> {
    debug!(%pref, "generating upgrade suggestions");
    match pref {
        DietaryPreference::Veg => {
            let input = SuggestVegUpgradesInput {
                meal_description: meal_description.to_string(),
                current_protein_grams,
            };
            suggest_veg_upgrades(flows, &input).await
        }
        DietaryPreference::Eggetarian | DietaryPreference::NonVeg => {
            let input = SuggestUpgradesInput {
                meal_description: meal_description.to_string(),
                current_protein_grams,
                dietary_preference: pref,
            };
            suggest_upgrades(flows, &input).await
        }
    }
}
