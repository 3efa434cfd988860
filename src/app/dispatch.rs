use crate::cli::{CharacterCommands, Cli, Commands};
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::Config;
use crate::app::console::ConsoleSink;
use crate::app::context::AppContext;
use crate::app::status::{render_config_summary, render_stats};
use crate::chat::ChatSession;
use crate::error::ChatError;
use crate::persona::Character;
use crate::pipeline::{
    FormatParser, MessageDisplaySequencer, MessageSegment, ResponseProcessor, ThreadRandom,
    similarity,
};
use crate::ui::style as ui;

/// Name used by `process` when no character file is given.
const DEFAULT_CHARACTER_NAME: &str = "小雪";

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Chat { character, message } => run_chat(config, &character, message).await,

        Commands::Process {
            text,
            character,
            json,
        } => run_process(&config, &text, character.as_deref(), json),

        Commands::Parse { text } => {
            let parser = FormatParser::new(config.display.clone());
            let segments = parser.parse(&text, "cli", &mut ThreadRandom);
            println!("{}", serde_json::to_string_pretty(&segments)?);
            Ok(())
        }

        Commands::Similarity { a, b } => {
            println!("{:.3}", similarity(&a, &b));
            Ok(())
        }

        Commands::Stats { reset } => {
            let ctx = AppContext::from_config(config).await?;
            if reset {
                ctx.compliance()
                    .reset_stats()
                    .await
                    .context("Failed to reset compliance stats")?;
                println!("{}", ui::success("Compliance stats reset"));
            }
            println!("{}", render_stats(&ctx.compliance().stats().await));
            println!();
            println!("{}", render_config_summary(ctx.config()));
            Ok(())
        }

        Commands::Character { character_command } => match character_command {
            CharacterCommands::Validate { file } => {
                let character = load_character(&file)?;
                println!(
                    "{} {} ({}, {} tags)",
                    ui::success("✓ valid"),
                    ui::speaker(&character.name),
                    character.voice_style,
                    character.tags.len()
                );
                Ok(())
            }
        },
    }
}

fn load_character(path: &Path) -> Result<Character> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read character file {}", path.display()))?;
    Character::from_generated(&raw)
        .with_context(|| format!("Invalid character file {}", path.display()))
}

async fn run_chat(config: Config, character_path: &Path, message: Option<String>) -> Result<()> {
    let character = load_character(character_path)?;
    let ctx = AppContext::from_config(config).await?;
    let sequencer = MessageDisplaySequencer::new(
        Arc::new(ConsoleSink::new()),
        ctx.config().display.typing_duration(),
    );
    let mut session = ctx.session(character);

    if let Some(message) = message {
        let result = send_turn(&mut session, &message).await;
        let outcome = match result {
            Ok(segments) => {
                show(&sequencer, segments).await;
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Chat request failed")),
        };
        sequencer.destroy();
        ctx.flush().await;
        return outcome;
    }

    println!(
        "{}",
        ui::dim(format!(
            "正在和{}聊天，输入 /quit 退出，Ctrl-C 取消当前回复",
            session.character().name
        ))
    );
    if let Some(greeting) = session.greeting() {
        show(&sequencer, vec![greeting]).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ui::speaker("你>"));
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            Ok(()) = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "/quit" | "/exit") {
            break;
        }

        match send_turn(&mut session, line).await {
            Ok(segments) => show(&sequencer, segments).await,
            Err(e) if e.is_cancelled() => println!("{}", ui::notice("（已取消）")),
            Err(e) => {
                tracing::warn!("chat turn failed: {e}");
                println!("{}", ui::error(e));
            }
        }
    }

    sequencer.destroy();
    ctx.flush().await;
    Ok(())
}

/// One request; Ctrl-C cancels it instead of killing the process.
async fn send_turn(session: &mut ChatSession, text: &str) -> Result<Vec<MessageSegment>, ChatError> {
    let cancel = CancellationToken::new();
    let request = session.send(text, &cancel);
    tokio::pin!(request);

    tokio::select! {
        result = &mut request => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            cancel.cancel();
            request.await
        }
    }
}

async fn show(sequencer: &MessageDisplaySequencer, segments: Vec<MessageSegment>) {
    let display = sequencer.display_messages(segments);
    tokio::pin!(display);

    tokio::select! {
        _ = &mut display => {}
        Ok(()) = tokio::signal::ctrl_c() => {
            sequencer.cancel();
            display.await;
        }
    }
}

fn run_process(config: &Config, text: &str, character: Option<&Path>, json: bool) -> Result<()> {
    let character = match character {
        Some(path) => load_character(path)?,
        None => Character::new(DEFAULT_CHARACTER_NAME),
    };
    if text.trim().is_empty() {
        bail!("Nothing to process");
    }

    let mut processor = ResponseProcessor::new(
        config.response.clone(),
        config.similarity.clone(),
        config.rewriter.clone(),
    );
    let outcome = processor.process_detailed(text, &character);

    if json {
        let report = serde_json::json!({
            "text": outcome.text,
            "structured": outcome.structured,
            "violations": outcome.violations,
            "similarity": outcome.similarity.map(|s| s.similarity),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", outcome.text);
        if !outcome.violations.is_empty() {
            let kinds: Vec<String> = outcome.violations.iter().map(ToString::to_string).collect();
            println!("{}", ui::dim(format!("violations: {}", kinds.join(", "))));
        }
    }
    Ok(())
}
