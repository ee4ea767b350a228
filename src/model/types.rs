use std::path::PathBuf;

use serde::Serialize;

/// Decoding controls for a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Upper bound on prompt plus generated tokens.
    pub max_length: usize,
    pub do_sample: bool,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    pub repetition_penalty: f64,
    pub no_repeat_ngram_size: usize,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecialTokens {
    pub eos_token_id: u32,
    pub pad_token_id: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub key: String,
    pub name: String,
    pub model_id: String,
    pub backend: String,
    pub size_bytes: u64,
}

/// A model the service is allowed to load.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSpec {
    pub key: String,
    pub name: String,
    pub model_id: String,
    pub description: String,
    #[serde(skip)]
    pub module_path: PathBuf,
    #[serde(skip)]
    pub tokenizer_path: PathBuf,
}

impl ModelSpec {
    pub fn genre_story_generator(module_path: PathBuf, tokenizer_path: PathBuf) -> Self {
        Self {
            key: "original".into(),
            name: "Original Story Generator".into(),
            model_id: "pranavpsv/gpt2-genre-story-generator".into(),
            description: "Specialized for story generation".into(),
            module_path,
            tokenizer_path,
        }
    }
}
