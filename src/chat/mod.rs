pub mod client;
pub mod scrub;
pub mod session;

pub use client::{ChatClient, ChatFuture, ChatTurn, CompletionRequest, OpenAiCompatibleClient, Role};
pub use session::{ChatSession, MAX_HISTORY_TURNS};
