//! `colloquy chat`: Interactive or single-message conversation.

use colloquy_config::EngineConfig;
use colloquy_core::SessionId;
use colloquy_engine::TurnEngine;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

pub async fn run(
    config: EngineConfig,
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = TurnEngine::from_config(config).await;
    if let Some(id) = session {
        engine = engine.with_session(SessionId::from(&id));
    }
    info!(session = %engine.session_id(), "Chat session started");

    if let Some(msg) = message {
        let reply = engine.process(msg).await;
        println!("{reply}");
        engine.shutdown().await;
        return Ok(());
    }

    let stats = engine.stats();
    println!();
    println!("  Colloquy: Interactive Mode");
    println!();
    println!("  Session:   {}", stats.session_id);
    println!("  Languages: {}", stats.languages.join(", "));
    println!("  Plugins:   {}", stats.plugins.join(", "));
    println!();
    println!("  Commands: /stats, /clear, /export, /lang <code>, /suggest <text>");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if matches!(input, "exit" | "quit") {
            break;
        }

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/stats", _) => println!("{}", serde_json::to_string_pretty(&engine.stats())?),
            ("/clear", _) => {
                engine.clear_context();
                println!("  Context cleared");
            }
            ("/export", _) => println!(
                "{}",
                serde_json::to_string_pretty(&engine.export_conversation())?
            ),
            ("/lang", code) => {
                debug!(code = code.trim(), "Language switch requested");
                if engine.set_language(code.trim()) {
                    println!("  Language: {}", engine.language());
                } else {
                    println!("  Language '{}' not available", code.trim());
                }
            }
            ("/suggest", partial) => {
                for suggestion in engine.autocomplete(partial) {
                    println!("  · {suggestion}");
                }
            }
            _ => {
                let reply = engine.process(input).await;
                for line in reply.lines() {
                    println!("  Colloquy > {line}");
                }
                println!();
            }
        }
        prompt()?;
    }

    engine.shutdown().await;
    let turns = engine.context().len();
    info!(session = %engine.session_id(), turns, "Chat session ended");
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
