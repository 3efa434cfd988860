pub mod commands;

pub use commands::{CharacterCommands, Cli, Commands};
