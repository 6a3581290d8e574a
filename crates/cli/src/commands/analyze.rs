//! `colloquy analyze`: Show how a message would be resolved.

use colloquy_config::EngineConfig;
use colloquy_engine::TurnEngine;

pub async fn run(config: EngineConfig, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = TurnEngine::new(config);
    let analysis = engine.analyze(message);
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
