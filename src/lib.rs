pub mod config;
pub mod error;
pub mod model;
pub mod page;
pub mod server;
pub mod speech;
pub mod story;
pub mod temp_files;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use model::{ModelRegistry, TextGenerator};
pub use server::build_router;
pub use story::{GenerationRequest, StoryWriter};
