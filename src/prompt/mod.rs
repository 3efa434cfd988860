mod builder;
mod engine;
pub mod store;

pub use builder::build_system_prompt;
pub use engine::TeraEngine;
pub use store::{PromptStore, STRICT_LENGTH_CONTROL_ID, SystemPrompt};
