use futures::future::try_join_all;
use tracing::{debug, info, warn};

use super::dto::{
    AnalyzeMealRequest, AnalyzePhotoInput, FamilyAnalyzeRequest, FamilyMealReport, MealAnalysis,
    MemberSuggestions, PhotoAnalysisOutput,
};
use crate::error::FlowError;
use crate::flows::{FlowInvoker, PromptDefinition, Shaped};
use crate::genai::SafetySetting;
use crate::suggestions::services::suggest_for;

pub const PHOTO_PROMPT: &str = "analyzeMealPhotoPrompt";

const PHOTO_TEMPLATE: &str = "You are an expert nutritionist. Analyze the meal in the photo. \
Identify the meal and provide a nutritional breakdown (protein, carbs, fat in grams, and total calories) \
for the whole plate as served.

Photo: {{media url=photoDataUri}}
";

const PHOTO_SAFETY: &[SafetySetting] = &[
    SafetySetting {
        category: "HARM_CATEGORY_HATE_SPEECH",
        threshold: "BLOCK_ONLY_HIGH",
    },
    SafetySetting {
        category: "HARM_CATEGORY_DANGEROUS_CONTENT",
        threshold: "BLOCK_NONE",
    },
    SafetySetting {
        category: "HARM_CATEGORY_HARASSMENT",
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    },
    SafetySetting {
        category: "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        threshold: "BLOCK_LOW_AND_ABOVE",
    },
];

pub fn prompts() -> Vec<PromptDefinition> {
    vec![PromptDefinition::new(
        PHOTO_PROMPT,
        PHOTO_TEMPLATE,
        AnalyzePhotoInput::SHAPE,
        PhotoAnalysisOutput::SHAPE,
    )
    .with_safety(PHOTO_SAFETY)]
}

/// Identifies the meal and its macros. Suggestions are left empty.
///
/// The data URI is decoded once, while the prompt is rendered, so a missing
/// or malformed photo still fails before any model call.
pub async fn analyze_photo(
    flows: &FlowInvoker,
    photo_data_uri: &str,
) -> Result<MealAnalysis, FlowError> {
    debug!(uri_len = photo_data_uri.len(), "analyzing meal photo");
    let input = AnalyzePhotoInput {
        photo_data_uri: photo_data_uri.to_string(),
    };
    let out: PhotoAnalysisOutput = flows.invoke(PHOTO_PROMPT, &input).await?;
    if out.meal_name.trim().is_empty() {
        warn!("model returned a blank meal name");
        return Err(FlowError::ModelOutput("mealName: must not be blank".into()));
    }
    Ok(MealAnalysis {
        meal_name: out.meal_name,
        macros: out.macros,
        protein_upgrade_suggestions: Vec::new(),
    })
}

/// Photo analysis followed by suggestions for one diner. The second call
/// depends on the first one's meal name and protein grams.
pub async fn analyze_meal(
    flows: &FlowInvoker,
    req: &AnalyzeMealRequest,
) -> Result<MealAnalysis, FlowError> {
    let mut analysis = analyze_photo(flows, &req.photo_data_uri).await?;
    analysis.protein_upgrade_suggestions = suggest_for(
        flows,
        &analysis.meal_name,
        analysis.macros.protein,
        req.dietary_preference,
    )
    .await?;
    info!(
        meal = %analysis.meal_name,
        suggestions = analysis.protein_upgrade_suggestions.len(),
        "meal analyzed"
    );
    Ok(analysis)
}

/// One photo analysis shared by all members, then one concurrent suggestion
/// call per member. Any member failure fails the whole report.
pub async fn analyze_family(
    flows: &FlowInvoker,
    req: &FamilyAnalyzeRequest,
) -> Result<FamilyMealReport, FlowError> {
    if req.family_members.is_empty() {
        return Err(FlowError::InputMissing(
            "At least one family member is required.".into(),
        ));
    }
    if let Some(i) = req
        .family_members
        .iter()
        .position(|m| m.name.trim().is_empty())
    {
        return Err(FlowError::InputMissing(format!(
            "Family member #{} has no name.",
            i + 1
        )));
    }

    let base = analyze_photo(flows, &req.photo_data_uri).await?;

    let per_member = req.family_members.iter().map(|member| {
        let meal_name = base.meal_name.as_str();
        let protein = base.macros.protein;
        async move {
            let suggestions =
                suggest_for(flows, meal_name, protein, member.dietary_preference).await?;
            Ok::<_, FlowError>(MemberSuggestions {
                name: member.name.clone(),
                dietary_preference: member.dietary_preference,
                suggestions,
            })
        }
    });
    let family_suggestions = try_join_all(per_member).await?;

    info!(
        meal = %base.meal_name,
        members = family_suggestions.len(),
        "family meal analyzed"
    );
    Ok(FamilyMealReport {
        meal_name: base.meal_name,
        base_macros: base.macros,
        family_suggestions,
    })
}

#[cfg(test)]
mod meal_tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::flows::test_invoker;
    use crate::genai::stub::StubModel;
    use crate::genai::GenAiError;
    use crate::meals::dto::FamilyMember;
    use crate::suggestions::dto::DietaryPreference;
    use crate::suggestions::services::fixtures::{mentions_non_veg, suggestions_for};
    use crate::suggestions::services::{DIET_AWARE_PROMPT, VEG_ONLY_PROMPT};

    const PHOTO: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

    fn photo_output() -> serde_json::Value {
        json!({
            "mealName": "Rajma Chawal",
            "macros": { "protein": 14, "carbs": 70, "fat": 9, "calories": 420 }
        })
    }

    fn full_stub() -> StubModel {
        StubModel::new()
            .with_output(PHOTO_PROMPT, photo_output())
            .with_output(VEG_ONLY_PROMPT, suggestions_for(DietaryPreference::Veg))
            .with_responder(DIET_AWARE_PROMPT, |req| {
                if req.text().contains("dietary preference is non-veg") {
                    Ok(suggestions_for(DietaryPreference::NonVeg))
                } else {
                    Ok(suggestions_for(DietaryPreference::Eggetarian))
                }
            })
    }

    fn member(name: &str, pref: DietaryPreference) -> FamilyMember {
        FamilyMember {
            name: name.into(),
            dietary_preference: pref,
        }
    }

    #[tokio::test]
    async fn photo_analysis_leaves_suggestions_empty() {
        let stub = full_stub().into_arc();
        let flows = test_invoker(stub.clone());
        let analysis = analyze_photo(&flows, PHOTO).await.unwrap();
        assert_eq!(analysis.meal_name, "Rajma Chawal");
        assert!(analysis.protein_upgrade_suggestions.is_empty());

        let reqs = stub.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].safety_settings.len(), 4);
        assert!(reqs[0]
            .parts
            .iter()
            .any(|p| matches!(p, crate::genai::PromptPart::Media { mime_type, .. } if mime_type == "image/jpeg")));
    }

    #[tokio::test]
    async fn single_meal_runs_analysis_then_suggestions() {
        let stub = full_stub().into_arc();
        let flows = test_invoker(stub.clone());
        let req = AnalyzeMealRequest {
            photo_data_uri: PHOTO.into(),
            dietary_preference: DietaryPreference::Eggetarian,
        };
        let analysis = analyze_meal(&flows, &req).await.unwrap();

        let m = analysis.macros;
        assert!(m.protein >= 0.0 && m.carbs >= 0.0 && m.fat >= 0.0 && m.calories >= 0.0);
        let names: Vec<_> = stub.requests().into_iter().map(|r| r.prompt_name).collect();
        assert_eq!(names, vec![PHOTO_PROMPT, DIET_AWARE_PROMPT]);
        let second = &stub.requests()[1];
        assert!(second
            .text()
            .contains("\"Rajma Chawal\" which contains 14.0 grams"));
        assert_eq!(
            analysis.protein_upgrade_suggestions[0].suggestion,
            "Add 2 boiled eggs"
        );
    }

    #[tokio::test]
    async fn single_meal_preserves_suggestion_order() {
        let stub = full_stub().into_arc();
        let flows = test_invoker(stub);
        let req = AnalyzeMealRequest {
            photo_data_uri: PHOTO.into(),
            dietary_preference: DietaryPreference::Veg,
        };
        let analysis = analyze_meal(&flows, &req).await.unwrap();
        let order: Vec<_> = analysis
            .protein_upgrade_suggestions
            .iter()
            .map(|s| s.suggestion.as_str())
            .collect();
        assert_eq!(
            order,
            vec![
                "Add 100g of paneer",
                "Top with roasted peanuts",
                "Stir in a cup of moong sprouts"
            ]
        );
    }

    #[tokio::test]
    async fn empty_photo_never_reaches_model() {
        let stub = full_stub().into_arc();
        let flows = test_invoker(stub.clone());
        let req = AnalyzeMealRequest {
            photo_data_uri: String::new(),
            dietary_preference: DietaryPreference::Veg,
        };
        let err = analyze_meal(&flows, &req).await.unwrap_err();
        assert!(matches!(err, FlowError::InputMissing(_)));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn negative_macros_are_rejected() {
        let stub = StubModel::new()
            .with_output(
                PHOTO_PROMPT,
                json!({
                    "mealName": "Salad",
                    "macros": { "protein": -1, "carbs": 10, "fat": 2, "calories": 80 }
                }),
            )
            .into_arc();
        let flows = test_invoker(stub);
        let err = analyze_photo(&flows, PHOTO).await.unwrap_err();
        assert!(matches!(err, FlowError::ModelOutput(_)));
    }

    #[tokio::test]
    async fn family_report_keeps_member_order_and_tiers() {
        let stub = full_stub().into_arc();
        let flows = test_invoker(stub.clone());
        let req = FamilyAnalyzeRequest {
            photo_data_uri: PHOTO.into(),
            family_members: vec![
                member("Asha", DietaryPreference::Veg),
                member("Bilal", DietaryPreference::NonVeg),
            ],
        };
        let report = analyze_family(&flows, &req).await.unwrap();

        assert_eq!(report.meal_name, "Rajma Chawal");
        assert_eq!(report.family_suggestions.len(), 2);
        assert_eq!(report.family_suggestions[0].name, "Asha");
        assert_eq!(report.family_suggestions[1].name, "Bilal");
        assert!(report.family_suggestions[0]
            .suggestions
            .iter()
            .all(|s| !mentions_non_veg(&s.suggestion)));
        assert!(report.family_suggestions[1]
            .suggestions
            .iter()
            .any(|s| mentions_non_veg(&s.suggestion)));

        let photo_calls = stub
            .requests()
            .iter()
            .filter(|r| r.prompt_name == PHOTO_PROMPT)
            .count();
        assert_eq!(photo_calls, 1);
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn family_order_does_not_follow_completion_order() {
        // The non-veg member's call is held back so it completes last.
        let stub = full_stub()
            .with_delay(|req| {
                (req.prompt_name == DIET_AWARE_PROMPT).then(|| Duration::from_millis(50))
            })
            .into_arc();
        let flows = test_invoker(stub);
        let req = FamilyAnalyzeRequest {
            photo_data_uri: PHOTO.into(),
            family_members: vec![
                member("First", DietaryPreference::NonVeg),
                member("Second", DietaryPreference::Veg),
                member("Third", DietaryPreference::Veg),
            ],
        };
        let report = analyze_family(&flows, &req).await.unwrap();
        let names: Vec<_> = report
            .family_suggestions
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        assert_eq!(
            report.family_suggestions[0].dietary_preference,
            DietaryPreference::NonVeg
        );
        assert!(report.family_suggestions[0]
            .suggestions
            .iter()
            .any(|s| mentions_non_veg(&s.suggestion)));
    }

    #[tokio::test]
    async fn one_member_failure_fails_the_family() {
        let stub = StubModel::new()
            .with_output(PHOTO_PROMPT, photo_output())
            .with_output(VEG_ONLY_PROMPT, suggestions_for(DietaryPreference::Veg))
            .with_responder(DIET_AWARE_PROMPT, |_| {
                Err(GenAiError::Status {
                    status: 503,
                    body: "overloaded".into(),
                })
            })
            .into_arc();
        let flows = test_invoker(stub);
        let req = FamilyAnalyzeRequest {
            photo_data_uri: PHOTO.into(),
            family_members: vec![
                member("Asha", DietaryPreference::Veg),
                member("Bilal", DietaryPreference::NonVeg),
            ],
        };
        let res = analyze_family(&flows, &req).await;
        assert!(matches!(res, Err(FlowError::Upstream(_))));
    }

    #[tokio::test]
    async fn family_input_checks_happen_before_any_call() {
        let stub = full_stub().into_arc();
        let flows = test_invoker(stub.clone());

        let no_members = FamilyAnalyzeRequest {
            photo_data_uri: PHOTO.into(),
            family_members: vec![],
        };
        assert!(matches!(
            analyze_family(&flows, &no_members).await,
            Err(FlowError::InputMissing(_))
        ));

        let unnamed = FamilyAnalyzeRequest {
            photo_data_uri: PHOTO.into(),
            family_members: vec![
                member("Asha", DietaryPreference::Veg),
                member(" ", DietaryPreference::Veg),
            ],
        };
        let err = analyze_family(&flows, &unnamed).await.unwrap_err();
        assert_eq!(err.to_string(), "Family member #2 has no name.");

        let no_photo = FamilyAnalyzeRequest {
            photo_data_uri: "".into(),
            family_members: vec![member("Asha", DietaryPreference::Veg)],
        };
        assert!(matches!(
            analyze_family(&flows, &no_photo).await,
            Err(FlowError::InputMissing(_))
        ));

        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn blank_meal_name_is_a_model_failure() {
        let stub = full_stub()
            .with_output(
                PHOTO_PROMPT,
                json!({
                    "mealName": " ",
                    "macros": { "protein": 14, "carbs": 70, "fat": 9, "calories": 420 }
                }),
            )
            .into_arc();
        let flows = test_invoker(stub.clone());

        let single = AnalyzeMealRequest {
            photo_data_uri: PHOTO.into(),
            dietary_preference: DietaryPreference::Veg,
        };
        let err = analyze_meal(&flows, &single).await.unwrap_err();
        assert!(matches!(err, FlowError::ModelOutput(_)), "{err}");
        assert!(!err.is_client_error());

        let family = FamilyAnalyzeRequest {
            photo_data_uri: PHOTO.into(),
            family_members: vec![member("Asha", DietaryPreference::NonVeg)],
        };
        let err = analyze_family(&flows, &family).await.unwrap_err();
        assert!(matches!(err, FlowError::ModelOutput(_)), "{err}");

        // Only the two photo calls were made.
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_photo_is_rejected_while_rendering() {
        let stub = full_stub().into_arc();
        let flows = test_invoker(stub.clone());

        let err = analyze_photo(&flows, "data:image/png;base64,@@@")
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)), "{err}");

        let err = analyze_photo(&flows, "data:text/plain;base64,aGVsbG8=")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("text/plain"), "{err}");

        let family = FamilyAnalyzeRequest {
            photo_data_uri: "not a data uri".into(),
            family_members: vec![member("Asha", DietaryPreference::Veg)],
        };
        let err = analyze_family(&flows, &family).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)), "{err}");

        assert_eq!(stub.calls(), 0);
    }
}
