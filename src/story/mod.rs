mod completeness;
mod heuristics;
mod normalizer;
mod prompt;
mod retry;

pub use completeness::is_story_complete;
pub use heuristics::EndingHeuristics;
pub use normalizer::normalize_story;
pub use prompt::{GenerationRequest, Genre, LengthTier, STORY_MARKER, build_prompt};
pub use retry::{GENERATION_FAILED, INCOMPLETE_STORY, StoryOutcome, StoryWriter};
