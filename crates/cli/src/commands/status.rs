//! `colloquy status`: Show engine status.

use colloquy_config::EngineConfig;
use colloquy_engine::TurnEngine;

pub async fn run(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = EngineConfig::config_dir().join("config.toml");
    let backend = config.persistence.backend.clone();
    let mut engine = TurnEngine::new(config);
    engine.start().await;
    let stats = engine.stats();

    println!("Colloquy Status");
    println!("===============");
    println!("  Config dir:   {}", EngineConfig::config_dir().display());
    println!("  Classifier:   {}", if stats.model_loaded { "loaded" } else { "lexical fallback" });
    println!("  Vocabulary:   {}", stats.vocabulary_size);
    println!("  Classes:      {}", stats.classes_count);
    println!("  Languages:    {} (default {})", stats.languages.join(", "), stats.default_language);
    for (lang, count) in &stats.intents_by_language {
        println!("  Intents [{lang}]: {count}");
    }
    println!("  Thresholds:   confidence {} / fallback {}", stats.confidence_threshold, stats.fallback_threshold);
    println!("  Context:      {} turns", stats.max_context);
    println!("  Plugins:      {}", stats.plugins.join(", "));
    println!("  Services:     {}", stats.services.join(", "));
    println!(
        "  Memory:       {} ({} embeddings, {})",
        if stats.memory.enabled { "enabled" } else { "disabled" },
        stats.memory.embeddings,
        stats.memory.provider
    );
    println!("  Persistence:  {backend}");

    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file: run `colloquy init --write` to create one");
    }

    engine.shutdown().await;
    Ok(())
}
