use std::sync::Arc;

use crate::{
    error::ServiceError,
    model::{ModelMetadata, ModelSpec, SamplingParams, SpecialTokens},
};

/// A loaded text-generation model.
///
/// `generate` blocks for the whole decode and returns the prompt followed by
/// the completion, the way a text-generation pipeline echoes its input.
pub trait TextGenerator: Send + Sync {
    fn metadata(&self) -> ModelMetadata;

    fn special_tokens(&self) -> SpecialTokens;

    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ServiceError>;
}

/// Builds a [`TextGenerator`] for a catalog entry. Loading may block.
pub trait ModelLoader: Send + Sync {
    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TextGenerator>, ServiceError>;
}
