use std::collections::HashMap;

use serde_json::Value;

use super::schema::{Kind, Shape};
use super::template::PromptTemplate;
use crate::genai::SafetySetting;

/// A named prompt bound to its input and output shapes.
#[derive(Debug)]
pub struct PromptDefinition {
    pub name: &'static str,
    pub template: PromptTemplate,
    pub input: &'static Shape,
    pub output: &'static Shape,
    pub safety_settings: &'static [SafetySetting],
    pub response_schema: Value,
}

impl PromptDefinition {
    pub fn new(
        name: &'static str,
        template: impl Into<String>,
        input: &'static Shape,
        output: &'static Shape,
    ) -> Self {
        Self {
            name,
            template: PromptTemplate::new(template),
            input,
            output,
            safety_settings: &[],
            response_schema: output.response_schema(),
        }
    }

    pub fn with_safety(mut self, settings: &'static [SafetySetting]) -> Self {
        self.safety_settings = settings;
        self
    }
}

/// Prompt definitions keyed by name. Built once at start-up and shared.
#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: HashMap<&'static str, PromptDefinition>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every prompt the service ships with.
    pub fn builtin() -> anyhow::Result<Self> {
        let mut registry = Self::new();
        let defs = crate::meals::prompts()
            .into_iter()
            .chain(crate::suggestions::prompts())
            .chain(crate::routes::prompts());
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Rejects duplicate names and placeholders that the input shape does
    /// not declare at the top level.
    pub fn register(&mut self, def: PromptDefinition) -> anyhow::Result<()> {
        if self.prompts.contains_key(def.name) {
            anyhow::bail!("prompt '{}' registered twice", def.name);
        }
        for placeholder in def.template.placeholders() {
            let declared = def.input.fields.iter().any(|f| {
                f.name == placeholder && !matches!(f.kind, Kind::Object(_) | Kind::Array(_))
            });
            if !declared {
                anyhow::bail!(
                    "prompt '{}' uses '{{{{{}}}}}' which '{}' does not declare as a scalar field",
                    def.name,
                    placeholder,
                    def.input.name
                );
            }
        }
        tracing::debug!(prompt = def.name, "prompt registered");
        self.prompts.insert(def.name, def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.get(name)
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.prompts.len()
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use crate::flows::schema::Field;

    const INPUT: Shape = Shape {
        name: "echoInput",
        fields: &[Field {
            name: "text",
            kind: Kind::String,
            required: true,
            description: "",
        }],
    };
    const OUTPUT: Shape = Shape {
        name: "echoOutput",
        fields: &[Field {
            name: "echo",
            kind: Kind::String,
            required: true,
            description: "",
        }],
    };

    #[test]
    fn rejects_duplicates_and_undeclared_placeholders() {
        let mut r = PromptRegistry::new();
        r.register(PromptDefinition::new("echo", "Say {{text}}", &INPUT, &OUTPUT))
            .unwrap();
        assert!(r
            .register(PromptDefinition::new("echo", "Again {{text}}", &INPUT, &OUTPUT))
            .is_err());

        let err = r
            .register(PromptDefinition::new("bad", "Say {{other}}", &INPUT, &OUTPUT))
            .unwrap_err();
        assert!(err.to_string().contains("{{other}}"), "{err}");
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn builtin_registry_is_consistent() {
        let r = PromptRegistry::builtin().unwrap();
        for name in [
            "analyzeMealPhotoPrompt",
            "suggestProteinUpgradesPrompt",
            "suggestProteinUpgradesForVegPrompt",
            "cookingCoachPrompt",
            "ingredientLookupPrompt",
            "translateTextPrompt",
        ] {
            assert!(r.get(name).is_some(), "{name} missing");
        }
        assert_eq!(r.len(), 6);
    }

    #[test]
    fn response_schema_is_precomputed() {
        let def = PromptDefinition::new("echo", "Say {{text}}", &INPUT, &OUTPUT);
        assert_eq!(def.response_schema["required"][0], "echo");
    }
}
