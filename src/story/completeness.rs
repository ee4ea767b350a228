use super::heuristics::EndingHeuristics;

const MIN_CHARS: usize = 50;
const MIN_WORDS: usize = 30;

/// Heuristic check that a normalized story reads as finished.
pub fn is_story_complete(story: &str, heuristics: &EndingHeuristics) -> bool {
    if !long_enough(story) {
        return false;
    }

    let lowered = story.to_lowercase();
    // Normalization always leaves terminal punctuation, so compare the bare tail.
    let tail = lowered
        .trim_end()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'));
    let cut_off = heuristics.incomplete_patterns.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        lowered.contains(&pattern) && tail.ends_with(&pattern)
    });
    if cut_off {
        return false;
    }

    if !story.trim_end().ends_with(['.', '!', '?']) {
        return false;
    }

    story.split_whitespace().count() >= MIN_WORDS
}

fn long_enough(story: &str) -> bool {
    story.trim().chars().count() >= MIN_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(story: &str) -> bool {
        is_story_complete(story, &EndingHeuristics::default())
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn rejects_short_text() {
        assert!(!complete("Hi."));
        assert!(!complete(""));
    }

    #[test]
    fn accepts_long_punctuated_story() {
        assert!(complete(&format!("{}.", words(40))));
        assert!(complete(&format!("{}!", words(30))));
    }

    #[test]
    fn rejects_story_cut_off_on_known_pattern() {
        let cut = format!("{} and she was taken away by the.", words(32));
        assert_eq!(cut.split_whitespace().count(), 40);
        assert!(!complete(&cut));

        let finished = format!(
            "{} and she was taken away by the evil witch for good.",
            words(32)
        );
        assert!(complete(&finished));
    }

    #[test]
    fn pattern_match_ignores_case() {
        let cut = format!("{} Then The Old Woman Asks The Girl If She Will.", words(30));
        assert!(!complete(&cut));
    }

    #[test]
    fn rejects_missing_terminal_punctuation() {
        assert!(!complete(&words(40)));
    }

    #[test]
    fn rejects_fewer_than_thirty_words() {
        let story = "Supercalifragilisticexpialidocious adventures happened everywhere. \
                     Nobody expected such extraordinary circumstances.";
        assert!(story.chars().count() >= MIN_CHARS);
        assert!(!complete(story));
    }

    #[test]
    fn character_floor_boundary() {
        let short = "a".repeat(MIN_CHARS - 1);
        let exact = "a".repeat(MIN_CHARS);
        assert!(!long_enough(&short));
        assert!(!long_enough(&format!("  {short}\n")));
        assert!(long_enough(&exact));
        assert!(!complete(&format!("{}.", "a".repeat(MIN_CHARS - 2))));
    }

    #[test]
    fn word_floor_boundary() {
        assert!(!complete(&format!("{}.", words(MIN_WORDS - 1))));
        assert!(complete(&format!("{}.", words(MIN_WORDS))));
    }

    #[test]
    fn trailing_whitespace_does_not_hide_punctuation() {
        assert!(complete(&format!("{}.  \n", words(35))));
    }
}
