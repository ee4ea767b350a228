use std::collections::HashSet;

use rand::{
    Rng,
    distributions::{Distribution, WeightedIndex},
};

use crate::model::SamplingParams;

pub struct Sampler<'a> {
    params: &'a SamplingParams,
}

impl<'a> Sampler<'a> {
    pub fn new(params: &'a SamplingParams) -> Self {
        Self { params }
    }

    /// Picks the next token. `history` holds every token so far, prompt included.
    pub fn next_token<R: Rng + ?Sized>(
        &self,
        logits: &mut [f32],
        history: &[u32],
        rng: &mut R,
    ) -> u32 {
        apply_repetition_penalty(logits, history, self.params.repetition_penalty as f32);
        ban_repeated_ngrams(logits, history, self.params.no_repeat_ngram_size);

        if !self.params.do_sample {
            return argmax(logits);
        }

        apply_temperature(logits, self.params.temperature as f32);
        keep_top_k(logits, self.params.top_k);
        keep_top_p(logits, self.params.top_p as f32);
        draw(logits, rng)
    }
}

fn apply_repetition_penalty(logits: &mut [f32], history: &[u32], penalty: f32) {
    if penalty == 1.0 || penalty <= 0.0 {
        return;
    }
    let seen: HashSet<u32> = history.iter().copied().collect();
    for id in seen {
        if let Some(logit) = logits.get_mut(id as usize) {
            if *logit < 0.0 {
                *logit *= penalty;
            } else {
                *logit /= penalty;
            }
        }
    }
}

/// Bans every token that would complete an n-gram already present in `history`.
fn ban_repeated_ngrams(logits: &mut [f32], history: &[u32], n: usize) {
    if n == 0 || history.len() + 1 < n {
        return;
    }
    let prefix = &history[history.len() + 1 - n..];
    for window in history.windows(n) {
        if &window[..n - 1] == prefix {
            if let Some(logit) = logits.get_mut(window[n - 1] as usize) {
                *logit = f32::NEG_INFINITY;
            }
        }
    }
}

fn apply_temperature(logits: &mut [f32], temperature: f32) {
    if temperature <= 0.0 || temperature == 1.0 {
        return;
    }
    for logit in logits.iter_mut() {
        *logit /= temperature;
    }
}

fn keep_top_k(logits: &mut [f32], k: usize) {
    if k == 0 || k >= logits.len() {
        return;
    }
    let mut sorted = logits.to_vec();
    sorted.sort_unstable_by(|a, b| b.total_cmp(a));
    let threshold = sorted[k - 1];
    for logit in logits.iter_mut() {
        if *logit < threshold {
            *logit = f32::NEG_INFINITY;
        }
    }
}

/// Keeps the smallest set of most likely tokens whose mass reaches `p`.
fn keep_top_p(logits: &mut [f32], p: f32) {
    if p >= 1.0 || p <= 0.0 {
        return;
    }
    let probs = softmax(logits);
    let mut order: Vec<usize> = (0..logits.len()).collect();
    order.sort_unstable_by(|&a, &b| probs[b].total_cmp(&probs[a]));

    let mut cumulative = 0.0;
    let mut keep = 0;
    for &idx in &order {
        cumulative += probs[idx];
        keep += 1;
        if cumulative >= p {
            break;
        }
    }
    for &idx in &order[keep..] {
        logits[idx] = f32::NEG_INFINITY;
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn draw<R: Rng + ?Sized>(logits: &[f32], rng: &mut R) -> u32 {
    let probs = softmax(logits);
    match WeightedIndex::new(&probs) {
        Ok(dist) => dist.sample(rng) as u32,
        Err(_) => argmax(logits),
    }
}

fn argmax(logits: &[f32]) -> u32 {
    logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx as u32)
        .unwrap_or(0)
}
