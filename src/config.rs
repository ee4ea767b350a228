use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

#[cfg(feature = "tch-backend")]
use tch::Device;

use crate::{model::ModelSpec, story::EndingHeuristics};

/// Decoding defaults for the retry loop. Temperature rises by `temperature_step` per attempt.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub temperature_step: f64,
    pub top_k: usize,
    pub top_p: f64,
    pub repetition_penalty: f64,
    pub no_repeat_ngram_size: usize,
    pub max_attempts: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            temperature_step: 0.1,
            top_k: 40,
            top_p: 0.9,
            repetition_penalty: 1.1,
            no_repeat_ngram_size: 2,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub base_url: String,
    pub lang: String,
    pub slow: bool,
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translate.google.com".into(),
            lang: "en".into(),
            slow: false,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub temp_dir: PathBuf,
    pub interval: Duration,
    pub max_age: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            temp_dir: env::temp_dir(),
            interval: Duration::from_secs(3600),
            max_age: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_key: String,
    pub models: Vec<ModelSpec>,
    pub sampling: SamplingConfig,
    pub heuristics: EndingHeuristics,
    pub speech: SpeechConfig,
    pub cleanup: CleanupConfig,
    #[cfg(feature = "tch-backend")]
    pub device: Device,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            model_key: "original".into(),
            models: vec![ModelSpec::genre_story_generator(
                PathBuf::from("models/gpt2_genre_story_generator.ts"),
                PathBuf::from("models/tokenizer.json"),
            )],
            sampling: SamplingConfig::default(),
            heuristics: EndingHeuristics::default(),
            speech: SpeechConfig::default(),
            cleanup: CleanupConfig::default(),
            #[cfg(feature = "tch-backend")]
            device: Device::Cpu,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let listen_addr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".into())
            .parse()
            .unwrap_or(defaults.listen_addr);

        let model_key = env::var("MODEL_KEY").unwrap_or(defaults.model_key);
        let module_path = PathBuf::from(
            env::var("MODEL_MODULE_PATH")
                .unwrap_or_else(|_| "models/gpt2_genre_story_generator.ts".to_string()),
        );
        let tokenizer_path = PathBuf::from(
            env::var("TOKENIZER_PATH").unwrap_or_else(|_| "models/tokenizer.json".to_string()),
        );
        let models = vec![ModelSpec::genre_story_generator(module_path, tokenizer_path)];

        let base = defaults.sampling;
        let sampling = SamplingConfig {
            temperature: env_or("TEMPERATURE", base.temperature),
            temperature_step: env_or("TEMPERATURE_STEP", base.temperature_step),
            top_k: env_or("TOP_K", base.top_k),
            top_p: env_or("TOP_P", base.top_p),
            repetition_penalty: env_or("REPETITION_PENALTY", base.repetition_penalty),
            no_repeat_ngram_size: env_or("NO_REPEAT_NGRAM_SIZE", base.no_repeat_ngram_size),
            max_attempts: env_or("MAX_ATTEMPTS", base.max_attempts).max(1),
        };

        let heuristics = match env::var("HEURISTICS_PATH").ok() {
            Some(path) => EndingHeuristics::from_path(PathBuf::from(path).as_path())?,
            None => defaults.heuristics,
        };

        let speech = SpeechConfig {
            base_url: env::var("TTS_BASE_URL").unwrap_or(defaults.speech.base_url),
            lang: env::var("TTS_LANG").unwrap_or(defaults.speech.lang),
            slow: env_or("TTS_SLOW", defaults.speech.slow),
            timeout: env::var("TTS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.speech.timeout),
        };

        let cleanup = CleanupConfig {
            temp_dir: env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cleanup.temp_dir),
            interval: Duration::from_secs(env_or("CLEANUP_INTERVAL_SECS", 3600u64).max(1)),
            max_age: Duration::from_secs(env_or("TEMP_MAX_AGE_SECS", 3600u64)),
        };

        #[cfg(feature = "tch-backend")]
        let device = {
            let raw = env::var("DEVICE").unwrap_or_else(|_| "cpu".into());
            parse_device(&raw)
        };

        Ok(Self {
            listen_addr,
            model_key,
            models,
            sampling,
            heuristics,
            speech,
            cleanup,
            #[cfg(feature = "tch-backend")]
            device,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(feature = "tch-backend")]
fn parse_device(raw: &str) -> Device {
    let lower = raw.to_lowercase();
    if lower == "cpu" {
        Device::Cpu
    } else if lower.starts_with("cuda") {
        let idx = lower
            .split(':')
            .nth(1)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        if tch::Cuda::is_available() {
            Device::Cuda(idx)
        } else {
            Device::Cpu
        }
    } else {
        Device::Cpu
    }
}
