use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `charachat` - chat with AI characters in the terminal.
#[derive(Parser, Debug)]
#[command(name = "charachat")]
#[command(version = "0.1.0")]
#[command(about = "Chat with AI characters that reply like people do.", long_about = None)]
pub struct Cli {
    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with a character (interactive unless --message is given)
    Chat {
        /// Character JSON file
        #[arg(short, long)]
        character: PathBuf,

        /// Send one message, show the reply and exit
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Run the reply processor on a piece of text
    Process {
        text: String,

        /// Character JSON file (defaults to a plain gentle character)
        #[arg(short, long)]
        character: Option<PathBuf>,

        /// Print violations and similarity as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the message segments parsed from inline markup as JSON
    Parse { text: String },

    /// Print the similarity score of two texts
    Similarity { a: String, b: String },

    /// Show compliance statistics
    Stats {
        /// Zero all counters and the prompt strength level
        #[arg(long)]
        reset: bool,
    },

    /// Manage character definitions
    Character {
        #[command(subcommand)]
        character_command: CharacterCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CharacterCommands {
    /// Check a character JSON file (bare or fenced model output)
    Validate { file: PathBuf },
}
