use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::SpeechConfig;

/// Longest chunk the endpoint accepts.
const MAX_CHUNK_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("no text to synthesize")]
    EmptyText,
    #[error("network error: {0}")]
    Network(String),
    #[error("service returned {status} for chunk {chunk}")]
    Status { status: u16, chunk: usize },
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns MPEG audio for `text`.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}

pub struct GoogleTtsClient {
    client: Client,
    config: SpeechConfig,
}

impl GoogleTtsClient {
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SpeechError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_tts", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let speed = if self.config.slow { "0.3" } else { "1" };
        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx_param = idx.to_string();
            let len_param = chunk.chars().count().to_string();
            let response = self
                .client
                .get(self.endpoint())
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk.as_str()),
                    ("tl", self.config.lang.as_str()),
                    ("client", "tw-ob"),
                    ("ttsspeed", speed),
                    ("total", total.as_str()),
                    ("idx", idx_param.as_str()),
                    ("textlen", len_param.as_str()),
                ])
                .send()
                .await
                .map_err(|e| SpeechError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SpeechError::Status {
                    status: status.as_u16(),
                    chunk: idx,
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| SpeechError::Network(e.to_string()))?;
            audio.extend_from_slice(&bytes);
        }

        tracing::debug!(chunks = chunks.len(), bytes = audio.len(), "speech synthesized");
        Ok(audio)
    }
}

/// Splits on whitespace into chunks of at most `max_chars` characters.
/// Words longer than `max_chars` are hard-split.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
