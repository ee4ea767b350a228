mod generator;
mod registry;
mod sampler;
mod types;

#[cfg(feature = "tch-backend")]
mod loader;

pub use generator::{ModelLoader, TextGenerator};
#[cfg(feature = "tch-backend")]
pub use loader::{TorchScriptGenerator, TorchScriptLoader};
pub use registry::{ActiveModel, ModelRegistry, RegistrySnapshot};
pub use sampler::Sampler;
pub use types::{ModelMetadata, ModelSpec, SamplingParams, SpecialTokens};
