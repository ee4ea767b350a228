use std::collections::HashSet;

use super::heuristics::EndingHeuristics;

const TERMINAL_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Turns raw model output into prose that ends cleanly.
///
/// Repairs known cut-off endings, forces terminal punctuation, then drops
/// sentences that are too short or repeat an earlier sentence verbatim.
pub fn normalize_story(raw: &str, heuristics: &EndingHeuristics) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return heuristics.empty_placeholder.clone();
    }

    let story = repair_ending(trimmed, heuristics);
    let sentences = distinct_sentences(&story);
    if sentences.is_empty() {
        return heuristics.empty_placeholder.clone();
    }

    let mut joined = sentences.join(". ");
    if !joined.ends_with('.') {
        joined.push('.');
    }
    joined
}

fn repair_ending(story: &str, heuristics: &EndingHeuristics) -> String {
    let mut story = story.to_string();

    if heuristics
        .incomplete_endings
        .iter()
        .any(|ending| story.ends_with(ending.as_str()))
    {
        story.push_str(&heuristics.ending_completion);
        return story;
    }

    if !story.ends_with(TERMINAL_PUNCTUATION) {
        let last_fragment = story.rsplit('.').next().unwrap_or_default().trim();
        if last_fragment.chars().count() > 10 {
            story.push('.');
        } else {
            story = format!(
                "{}{}",
                story.trim_end_matches('.'),
                heuristics.generic_completion
            );
        }
    }

    story
}

/// Exact, case-sensitive dedup; first occurrence wins.
fn distinct_sentences(story: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    story
        .split('.')
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() > 5)
        .filter(|sentence| seen.insert(*sentence))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> String {
        normalize_story(raw, &EndingHeuristics::default())
    }

    #[test]
    fn known_incomplete_ending_gets_closing_clause() {
        let out = normalize("The princess was brave. She was taken away by the evil witch");
        assert_eq!(
            out,
            "The princess was brave. She was taken away by the evil witch find the answers they seek and live happily ever after."
        );
    }

    #[test]
    fn every_default_ending_is_completed() {
        let heuristics = EndingHeuristics::default();
        for ending in &heuristics.incomplete_endings {
            let raw = format!("Once upon a time in a quiet village. {ending}");
            let expected_tail = format!("{ending}{}", heuristics.ending_completion);
            assert!(normalize(&raw).ends_with(&expected_tail), "{ending}");
        }
    }

    #[test]
    fn long_trailing_fragment_gets_a_period() {
        assert_eq!(
            normalize("The knight rode into the dark forest"),
            "The knight rode into the dark forest."
        );
    }

    #[test]
    fn short_trailing_fragment_gets_generic_ending() {
        assert_eq!(
            normalize("The knight slept soundly. Then he"),
            "The knight slept soundly. Then he and they all lived happily ever after."
        );
    }

    #[test]
    fn trailing_fragment_length_boundary() {
        assert_eq!(
            normalize("Once upon a time. abcdefghij"),
            "Once upon a time. abcdefghij and they all lived happily ever after."
        );
        assert_eq!(
            normalize("Once upon a time. abcdefghijk"),
            "Once upon a time. abcdefghijk."
        );
    }

    #[test]
    fn sentence_length_boundary() {
        assert_eq!(
            normalize("Once upon a time. abcde. abcdef."),
            "Once upon a time. abcdef."
        );
    }

    #[test]
    fn duplicate_and_short_sentences_are_dropped() {
        assert_eq!(
            normalize("Yes. The cat sat down. The cat sat down. A dog barked loudly."),
            "The cat sat down. A dog barked loudly."
        );
    }

    #[test]
    fn dedup_is_case_sensitive() {
        assert_eq!(
            normalize("The cat sat down. the cat sat down."),
            "The cat sat down. the cat sat down."
        );
    }

    #[test]
    fn empty_or_blank_input_yields_placeholder() {
        let placeholder = EndingHeuristics::default().empty_placeholder;
        assert_eq!(normalize(""), placeholder);
        assert_eq!(normalize("   \n\t "), placeholder);
    }

    #[test]
    fn input_with_only_short_sentences_yields_placeholder() {
        assert_eq!(normalize("Hi. Yo. Ok."), EndingHeuristics::default().empty_placeholder);
    }

    #[test]
    fn output_always_ends_with_terminal_punctuation() {
        let inputs = [
            "It was a dark and stormy night",
            "Where did the dragon go?",
            "The end!",
            "a. b. c",
            "The wizard laughed... and then",
        ];
        for raw in inputs {
            let out = normalize(raw);
            assert!(out.ends_with(TERMINAL_PUNCTUATION), "{raw:?} -> {out:?}");
        }
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = normalize(
            "The dragon woke early. It flew over the mountains. The village cheered below",
        );
        assert_eq!(normalize(&once), once);
    }
}
