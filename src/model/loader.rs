use std::{fs, path::Path, sync::Arc, time::Instant};

use parking_lot::Mutex;
use tch::{Device, IValue, Kind, Tensor, no_grad};
use tokenizers::Tokenizer;

use crate::{
    error::ServiceError,
    model::{
        ModelLoader, ModelMetadata, ModelSpec, SamplingParams, SpecialTokens, TextGenerator,
        sampler::Sampler,
    },
};

const EOS_TOKEN: &str = "<|endoftext|>";

/// Loads traced GPT-2 modules and their `tokenizer.json` onto a fixed device.
pub struct TorchScriptLoader {
    device: Device,
}

impl TorchScriptLoader {
    pub fn new(device: Device) -> Self {
        Self { device }
    }
}

impl ModelLoader for TorchScriptLoader {
    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TextGenerator>, ServiceError> {
        Ok(Arc::new(TorchScriptGenerator::load(spec, self.device)?))
    }
}

pub struct TorchScriptGenerator {
    metadata: ModelMetadata,
    tokenizer: Tokenizer,
    special: SpecialTokens,
    device: Device,
    module: Mutex<tch::CModule>,
}

impl TorchScriptGenerator {
    pub fn load(spec: &ModelSpec, device: Device) -> Result<Self, ServiceError> {
        let tokenizer = Tokenizer::from_file(spec.tokenizer_path.as_path())
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        let eos_token_id = tokenizer.token_to_id(EOS_TOKEN).ok_or_else(|| {
            ServiceError::Tokenizer(format!("vocabulary has no {EOS_TOKEN} token"))
        })?;

        let module_path: &Path = spec.module_path.as_path();
        if !module_path.exists() {
            return Err(ServiceError::Other(format!(
                "model artifact missing: {}",
                module_path.display()
            )));
        }
        let size_bytes = fs::metadata(module_path)?.len();
        let mut module = tch::CModule::load_on_device(module_path, device)
            .map_err(|e| ServiceError::Inference(e.to_string()))?;
        module.set_eval();

        Ok(Self {
            metadata: ModelMetadata {
                key: spec.key.clone(),
                name: spec.name.clone(),
                model_id: spec.model_id.clone(),
                backend: "torchscript".into(),
                size_bytes,
            },
            tokenizer,
            // GPT-2 has no pad token; padding reuses EOS.
            special: SpecialTokens {
                eos_token_id,
                pad_token_id: eos_token_id,
            },
            device,
            module: Mutex::new(module),
        })
    }

    fn next_logits(&self, module: &tch::CModule, ids: &[i64]) -> Result<Vec<f32>, ServiceError> {
        let input = Tensor::from_slice(ids)
            .reshape([1, ids.len() as i64])
            .to(self.device);

        let output = module
            .forward_is(&[IValue::Tensor(input)])
            .map_err(|e| ServiceError::Inference(e.to_string()))?;

        // traced GPT-2 returns either the logits or (logits, past)
        let logits = match output {
            IValue::Tensor(t) => t,
            IValue::Tuple(ref tuple) if !tuple.is_empty() => match &tuple[0] {
                IValue::Tensor(t) => t.shallow_clone(),
                _ => {
                    return Err(ServiceError::Inference(
                        "expected tensor as first tuple element".into(),
                    ));
                }
            },
            _ => {
                return Err(ServiceError::Inference(
                    "unexpected model output format".into(),
                ));
            }
        };

        let last = logits
            .select(1, -1)
            .squeeze()
            .to_kind(Kind::Float)
            .to(Device::Cpu);
        Vec::<f32>::try_from(&last).map_err(|e| ServiceError::Inference(e.to_string()))
    }
}

impl TextGenerator for TorchScriptGenerator {
    fn metadata(&self) -> ModelMetadata {
        self.metadata.clone()
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ServiceError> {
        if prompt.trim().is_empty() {
            return Err(ServiceError::BadRequest("prompt must not be empty".into()));
        }

        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        let mut ids: Vec<u32> = encoding.get_ids().to_vec();
        if ids.is_empty() {
            ids.push(params.pad_token_id);
        }
        let prompt_len = ids.len();
        let max_new_tokens = params.max_length.saturating_sub(prompt_len);

        let sampler = Sampler::new(params);
        let mut rng = rand::thread_rng();
        let start = Instant::now();

        no_grad(|| {
            let module = self.module.lock();
            for _ in 0..max_new_tokens {
                let input: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
                let mut logits = self.next_logits(&module, &input)?;
                let next = sampler.next_token(&mut logits, &ids, &mut rng);
                ids.push(next);
                if next == params.eos_token_id {
                    break;
                }
            }
            Ok::<(), ServiceError>(())
        })?;

        tracing::debug!(
            prompt_tokens = prompt_len,
            generated_tokens = ids.len() - prompt_len,
            elapsed_ms = start.elapsed().as_millis() as u64,
            temperature = params.temperature,
            "decode finished"
        );

        with_prompt_text(prompt, &ids[prompt_len..], |tail| {
            self.tokenizer
                .decode(tail, true)
                .map_err(|e| ServiceError::Tokenizer(e.to_string()))
        })
    }
}

// Re-decoding the prompt ids would drop special tokens typed into the theme.
fn with_prompt_text(
    prompt: &str,
    generated: &[u32],
    decode: impl FnOnce(&[u32]) -> Result<String, ServiceError>,
) -> Result<String, ServiceError> {
    let continuation = decode(generated)?;
    Ok(format!("{prompt}{continuation}"))
}
