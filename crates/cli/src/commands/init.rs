//! `colloquy init`: Print or write the default configuration.

use colloquy_config::EngineConfig;

pub fn run(write: bool) -> Result<(), Box<dyn std::error::Error>> {
    let toml = EngineConfig::default_toml();
    if !write {
        print!("{toml}");
        return Ok(());
    }

    let config_dir = EngineConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("  Config already exists: {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, toml)?;
    println!("✅ Wrote {}", config_path.display());
    Ok(())
}
