use serde::Serialize;

/// Marker that tells the model where the instruction ends and the story begins.
pub const STORY_MARKER: &str = "\n\nStory:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Genre {
    Fantasy,
    Romance,
    #[serde(rename = "Sci-Fi")]
    SciFi,
    Horror,
    Mystery,
}

impl Genre {
    pub const ALL: [Genre; 5] = [
        Genre::Fantasy,
        Genre::Romance,
        Genre::SciFi,
        Genre::Horror,
        Genre::Mystery,
    ];

    /// Parses a form value, falling back to [`Genre::Fantasy`] for anything unrecognised.
    pub fn parse_or_default(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|genre| genre.as_str() == raw)
            .unwrap_or(Genre::Fantasy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Fantasy => "Fantasy",
            Genre::Romance => "Romance",
            Genre::SciFi => "Sci-Fi",
            Genre::Horror => "Horror",
            Genre::Mystery => "Mystery",
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            Genre::Fantasy => {
                "Write a fantasy story with magic, mythical creatures, and adventure."
            }
            Genre::Romance => "Write a romantic story about love, relationships, and emotions.",
            Genre::SciFi => {
                "Write a science fiction story with futuristic technology, space, or advanced science."
            }
            Genre::Horror => "Write a horror story that creates suspense, fear, and mystery.",
            Genre::Mystery => "Write a mystery story with puzzles, clues, and investigation.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthTier {
    Short,
    Medium,
    Long,
}

impl LengthTier {
    pub const ALL: [LengthTier; 3] = [LengthTier::Short, LengthTier::Medium, LengthTier::Long];

    pub fn parse_or_default(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == raw)
            .unwrap_or(LengthTier::Medium)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthTier::Short => "short",
            LengthTier::Medium => "medium",
            LengthTier::Long => "long",
        }
    }

    pub fn token_budget(self) -> usize {
        match self {
            LengthTier::Short => 400,
            LengthTier::Medium => 600,
            LengthTier::Long => 1000,
        }
    }
}

/// A validated story request as submitted through the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    theme: String,
    genre: Genre,
    length: LengthTier,
}

impl GenerationRequest {
    pub fn new(theme: impl Into<String>, genre: Genre, length: LengthTier) -> Self {
        Self {
            theme: theme.into(),
            genre,
            length,
        }
    }

    pub fn token_budget(&self) -> usize {
        self.length.token_budget()
    }

    pub fn full_prompt(&self) -> String {
        build_prompt(&self.theme, self.genre)
    }
}

pub fn build_prompt(theme: &str, genre: Genre) -> String {
    format!("{} Theme: {theme}{STORY_MARKER}", genre.instruction())
}
