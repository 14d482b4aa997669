use crate::config::AppConfig;
use crate::flows::{FlowInvoker, PromptRegistry};
use crate::genai::{GeminiClient, GenerationClient};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<PromptRegistry>,
    pub model: Arc<dyn GenerationClient>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let model = Arc::new(GeminiClient::new(&config.genai)?) as Arc<dyn GenerationClient>;
        let registry = Arc::new(PromptRegistry::builtin()?);
        tracing::info!(
            prompts = registry.len(),
            model = %config.genai.model,
            "prompt registry ready"
        );

        Ok(Self::from_parts(config, registry, model))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        registry: Arc<PromptRegistry>,
        model: Arc<dyn GenerationClient>,
    ) -> Self {
        Self {
            config,
            registry,
            model,
        }
    }

    #[cfg(test)]
    pub fn fake(model: Arc<crate::genai::stub::StubModel>) -> Self {
        use crate::config::GenAiConfig;

        let config = Arc::new(AppConfig {
            genai: GenAiConfig {
                api_key: "test".into(),
                base_url: "http://fake.local".into(),
                model: "fake-model".into(),
                tts_model: "fake-tts".into(),
                tts_voice: "fake".into(),
                timeout_secs: None,
            },
            max_upload_bytes: 1024 * 1024,
        });
        let registry = Arc::new(PromptRegistry::builtin().expect("builtin prompts register"));
        Self::from_parts(config, registry, model)
    }
}

impl FromRef<AppState> for FlowInvoker {
    fn from_ref(state: &AppState) -> Self {
        FlowInvoker::new(state.registry.clone(), state.model.clone())
    }
}
