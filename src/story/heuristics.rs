use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndingHeuristics {
    /// Exact suffixes the normalizer completes with `ending_completion`.
    pub incomplete_endings: Vec<String>,
    /// Case-insensitive suffixes that make the completeness check reject a story.
    pub incomplete_patterns: Vec<String>,
    pub ending_completion: String,
    pub generic_completion: String,
    pub empty_placeholder: String,
}

const DEFAULT_ENDINGS: [&str; 5] = [
    "The old woman then asks the girl if she will",
    "and is eventually caught up in the story line",
    "taken away by the evil witch",
    "However, Jyao has trouble finding out",
    "and is later captured by the Fairy Godmother",
];

const EXTRA_PATTERNS: [&str; 3] = [
    "and is later captured by",
    "taken away by the",
    "asks the girl if she will",
];

impl Default for EndingHeuristics {
    fn default() -> Self {
        let incomplete_endings: Vec<String> =
            DEFAULT_ENDINGS.iter().map(|s| s.to_string()).collect();
        let incomplete_patterns = incomplete_endings
            .iter()
            .cloned()
            .chain(EXTRA_PATTERNS.iter().map(|s| s.to_string()))
            .collect();

        Self {
            incomplete_endings,
            incomplete_patterns,
            ending_completion: " find the answers they seek and live happily ever after.".into(),
            generic_completion: " and they all lived happily ever after.".into(),
            empty_placeholder: "Sorry, I couldn't generate a story this time. Please try again."
                .into(),
        }
    }
}

impl EndingHeuristics {
    pub fn from_path(path: &Path) -> Result<Self, ServiceError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            ServiceError::Config(format!("heuristics file {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_five_endings_and_eight_patterns() {
        let heuristics = EndingHeuristics::default();
        assert_eq!(heuristics.incomplete_endings.len(), 5);
        assert_eq!(heuristics.incomplete_patterns.len(), 8);
        assert!(
            heuristics
                .incomplete_patterns
                .contains(&"taken away by the".to_string())
        );
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heuristics.json");
        fs::write(&path, r#"{"incomplete_patterns": ["into the void"]}"#).unwrap();

        let heuristics = EndingHeuristics::from_path(&path).unwrap();
        assert_eq!(heuristics.incomplete_patterns, vec!["into the void"]);
        assert_eq!(
            heuristics.incomplete_endings,
            EndingHeuristics::default().incomplete_endings
        );
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heuristics.json");
        fs::write(&path, "not json").unwrap();

        let err = EndingHeuristics::from_path(&path).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
