mod invoker;
mod registry;
pub mod schema;
mod template;

pub use invoker::FlowInvoker;
pub use registry::{PromptDefinition, PromptRegistry};
pub use schema::{Field, Kind, Shape, Shaped};

#[cfg(test)]
pub fn test_invoker(model: std::sync::Arc<crate::genai::stub::StubModel>) -> FlowInvoker {
    let registry = PromptRegistry::builtin().expect("builtin prompts register");
    FlowInvoker::new(std::sync::Arc::new(registry), model)
}
