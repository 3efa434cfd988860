#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use charachat::Config;
use charachat::cli::Cli;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    // Initialize logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.logging.max_level()
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    charachat::app::dispatch::dispatch(cli, config).await
}
