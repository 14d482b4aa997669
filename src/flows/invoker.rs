use std::sync::Arc;
use std::time::Instant;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::registry::PromptRegistry;
use super::schema::{describe, Shaped};
use super::template::RenderError;
use crate::error::FlowError;
use crate::genai::{GenerationClient, GenerationRequest};

/// Runs a registered prompt against the model: validate input, render,
/// call once, validate output, deserialize.
#[derive(Clone)]
pub struct FlowInvoker {
    registry: Arc<PromptRegistry>,
    model: Arc<dyn GenerationClient>,
}

impl FlowInvoker {
    pub fn new(registry: Arc<PromptRegistry>, model: Arc<dyn GenerationClient>) -> Self {
        Self { registry, model }
    }

    pub fn model(&self) -> &dyn GenerationClient {
        self.model.as_ref()
    }

    pub async fn invoke<I, O>(&self, prompt: &str, input: &I) -> Result<O, FlowError>
    where
        I: Serialize + Shaped,
        O: DeserializeOwned + Shaped,
    {
        let def = self
            .registry
            .get(prompt)
            .ok_or_else(|| FlowError::UnknownPrompt(prompt.to_string()))?;
        if def.input.name != I::SHAPE.name || def.output.name != O::SHAPE.name {
            return Err(FlowError::UnknownPrompt(format!(
                "{} ({} -> {} requested, {} -> {} registered)",
                prompt,
                I::SHAPE.name,
                O::SHAPE.name,
                def.input.name,
                def.output.name
            )));
        }

        let value =
            serde_json::to_value(input).map_err(|e| FlowError::Validation(e.to_string()))?;
        def.input
            .validate(&value)
            .map_err(|v| FlowError::Validation(describe(&v)))?;
        let parts = def.template.render(&value).map_err(|e| match e {
            RenderError::Media { source, .. } => FlowError::from(source),
            other => FlowError::Validation(other.to_string()),
        })?;

        let request = GenerationRequest {
            prompt_name: def.name.to_string(),
            parts,
            response_schema: def.response_schema.clone(),
            safety_settings: def.safety_settings,
        };
        let started = Instant::now();
        let raw = self.model.generate(request).await?;
        debug!(
            prompt,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model call finished"
        );

        if let Err(violations) = def.output.validate(&raw) {
            let detail = describe(&violations);
            warn!(prompt, %detail, "model output does not match declared shape");
            return Err(FlowError::ModelOutput(detail));
        }
        serde_json::from_value(raw).map_err(|e| FlowError::ModelOutput(e.to_string()))
    }
}
