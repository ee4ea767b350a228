use tracing::{debug, info, warn};

use crate::{
    config::SamplingConfig,
    model::{SamplingParams, TextGenerator},
    story::{EndingHeuristics, is_story_complete, normalize_story},
};

pub const GENERATION_FAILED: &str =
    "Sorry, I encountered an issue generating your story. Please try again with a different prompt.";
pub const INCOMPLETE_STORY: &str =
    "Sorry, I couldn't generate a complete story this time. Please try again with a different prompt.";

#[derive(Debug, Clone, PartialEq)]
pub struct StoryOutcome {
    pub story: String,
    pub attempts: usize,
    pub accepted: bool,
}

/// Runs the generate, normalize, check loop against one model.
pub struct StoryWriter<'a> {
    generator: &'a dyn TextGenerator,
    sampling: &'a SamplingConfig,
    heuristics: &'a EndingHeuristics,
}

impl<'a> StoryWriter<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        sampling: &'a SamplingConfig,
        heuristics: &'a EndingHeuristics,
    ) -> Self {
        Self {
            generator,
            sampling,
            heuristics,
        }
    }

    /// Decoding parameters for a zero-based attempt.
    ///
    /// The model echoes the prompt, so the length budget is widened by the
    /// prompt's word count.
    pub fn params_for_attempt(
        &self,
        full_prompt: &str,
        token_budget: usize,
        attempt: usize,
    ) -> SamplingParams {
        let special = self.generator.special_tokens();
        SamplingParams {
            max_length: token_budget + full_prompt.split_whitespace().count(),
            do_sample: true,
            temperature: self.sampling.temperature + self.sampling.temperature_step * attempt as f64,
            top_k: self.sampling.top_k,
            top_p: self.sampling.top_p,
            repetition_penalty: self.sampling.repetition_penalty,
            no_repeat_ngram_size: self.sampling.no_repeat_ngram_size,
            eos_token_id: special.eos_token_id,
            pad_token_id: special.pad_token_id,
        }
    }

    pub fn write(&self, full_prompt: &str, token_budget: usize) -> StoryOutcome {
        let max_attempts = self.sampling.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let params = self.params_for_attempt(full_prompt, token_budget, attempt);

            let raw = match self.generator.generate(full_prompt, &params) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(attempt = attempt + 1, error = %err, "story generation attempt failed");
                    if attempt + 1 == max_attempts {
                        return StoryOutcome {
                            story: GENERATION_FAILED.to_string(),
                            attempts: attempt + 1,
                            accepted: false,
                        };
                    }
                    continue;
                }
            };

            let candidate = raw.replace(full_prompt, "");
            let story = normalize_story(&candidate, self.heuristics);
            if is_story_complete(&story, self.heuristics) {
                info!(attempt = attempt + 1, words = story.split_whitespace().count(), "story accepted");
                return StoryOutcome {
                    story,
                    attempts: attempt + 1,
                    accepted: true,
                };
            }
            debug!(attempt = attempt + 1, temperature = params.temperature, "story rejected as incomplete");
        }

        StoryOutcome {
            story: INCOMPLETE_STORY.to_string(),
            attempts: max_attempts,
            accepted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ServiceError,
        story::{Genre, build_prompt},
        test_support::ScriptedGenerator,
    };

    const FINISHED: &str = "The dragon circled the tower at dawn and the whole kingdom watched in silence. \
        She landed softly beside the old well and spoke to the frightened children in a warm voice. \
        By nightfall the village had a new guardian and nobody feared the mountains again.";

    fn run(generator: &ScriptedGenerator) -> StoryOutcome {
        let sampling = SamplingConfig::default();
        let heuristics = EndingHeuristics::default();
        let prompt = build_prompt("a dragon", Genre::Fantasy);
        StoryWriter::new(generator, &sampling, &heuristics).write(&prompt, 400)
    }

    #[test]
    fn first_complete_candidate_short_circuits() {
        let generator = ScriptedGenerator::echoing(vec![Ok(FINISHED.into()), Ok(FINISHED.into())]);
        let outcome = run(&generator);

        assert!(outcome.accepted);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.story, FINISHED);
        assert_eq!(generator.calls().len(), 1);
    }

    #[test]
    fn echoed_prompt_is_stripped() {
        let generator = ScriptedGenerator::echoing(vec![Ok(FINISHED.into())]);
        let outcome = run(&generator);
        assert!(!outcome.story.contains("Story:"));
        assert!(!outcome.story.contains("Theme:"));
    }

    #[test]
    fn temperature_rises_per_attempt_and_other_controls_hold() {
        let generator = ScriptedGenerator::echoing(vec![
            Ok("Too short.".into()),
            Ok("Also short.".into()),
            Ok("Still short.".into()),
        ]);
        run(&generator);

        let calls = generator.calls();
        assert_eq!(calls.len(), 3);
        for (attempt, params) in calls.iter().enumerate() {
            let expected = 0.7 + 0.1 * attempt as f64;
            assert!((params.temperature - expected).abs() < 1e-9);
            assert!(params.do_sample);
            assert_eq!(params.top_k, 40);
            assert!((params.top_p - 0.9).abs() < 1e-9);
            assert!((params.repetition_penalty - 1.1).abs() < 1e-9);
            assert_eq!(params.no_repeat_ngram_size, 2);
            assert_eq!(params.eos_token_id, ScriptedGenerator::EOS);
            assert_eq!(params.pad_token_id, ScriptedGenerator::EOS);
        }
    }

    #[test]
    fn max_length_adds_prompt_word_count() {
        let generator = ScriptedGenerator::echoing(vec![Ok(FINISHED.into())]);
        run(&generator);

        let prompt = build_prompt("a dragon", Genre::Fantasy);
        let expected = 400 + prompt.split_whitespace().count();
        assert_eq!(generator.calls()[0].max_length, expected);
    }

    #[test]
    fn all_rejected_returns_incomplete_message() {
        let generator = ScriptedGenerator::echoing(vec![
            Ok("Too short.".into()),
            Ok("and she was taken away by the".into()),
            Ok(String::new()),
        ]);
        let outcome = run(&generator);

        assert!(!outcome.accepted);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.story,
            "Sorry, I couldn't generate a complete story this time. Please try again with a different prompt."
        );
    }

    #[test]
    fn error_then_success_recovers() {
        let generator = ScriptedGenerator::echoing(vec![
            Err(ServiceError::Inference("cuda oom".into())),
            Ok(FINISHED.into()),
        ]);
        let outcome = run(&generator);

        assert!(outcome.accepted);
        assert_eq!(outcome.attempts, 2);
    }

    #[test]
    fn error_on_last_attempt_returns_failure_message() {
        let generator = ScriptedGenerator::echoing(vec![
            Ok("Too short.".into()),
            Ok("Too short again.".into()),
            Err(ServiceError::Inference("boom".into())),
        ]);
        let outcome = run(&generator);

        assert!(!outcome.accepted);
        assert_eq!(outcome.story, GENERATION_FAILED);
    }
}
