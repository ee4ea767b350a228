use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::ServiceError,
    model::{ModelLoader, ModelMetadata, ModelSpec, SamplingParams, SpecialTokens, TextGenerator},
    speech::{SpeechError, SpeechSynthesizer},
};

/// Replays canned completions, echoing the prompt in front of each.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    calls: Mutex<Vec<SamplingParams>>,
}

impl ScriptedGenerator {
    pub const EOS: u32 = 50256;

    pub fn echoing(responses: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<SamplingParams> {
        self.calls.lock().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            key: "original".into(),
            name: "scripted".into(),
            model_id: "test/scripted".into(),
            backend: "test".into(),
            size_bytes: 0,
        }
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            eos_token_id: Self::EOS,
            pad_token_id: Self::EOS,
        }
    }

    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ServiceError> {
        self.calls.lock().push(params.clone());
        let next = self.responses.lock().pop_front().unwrap_or_else(|| Ok(String::new()));
        next.map(|completion| format!("{prompt} {completion}"))
    }
}

/// Hands out the same generator for every catalog entry.
pub struct FixedLoader(pub Arc<dyn TextGenerator>);

impl ModelLoader for FixedLoader {
    fn load(&self, _spec: &ModelSpec) -> Result<Arc<dyn TextGenerator>, ServiceError> {
        Ok(self.0.clone())
    }
}

pub struct FakeSpeech {
    pub fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        if self.fail {
            return Err(SpeechError::Status { status: 503, chunk: 0 });
        }
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(text.as_bytes());
        Ok(audio)
    }
}
