//! Colloquy CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Interactive or single-message conversation
//! - `analyze`: Show how a message would be resolved
//! - `status`: Show engine status
//! - `init`: Print or write the default configuration

use clap::{Parser, Subcommand};
use colloquy_config::EngineConfig;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "colloquy",
    about = "Colloquy: conversational turn-resolution engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ~/.colloquy/config.toml)
    #[arg(short, long, global = true, env = "COLLOQUY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the engine
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Resume a session id (useful with persistent backends)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show language, active features and predictions for a message
    Analyze {
        message: String,
    },

    /// Show engine status
    Status,

    /// Print the default configuration, or write it to the config path
    Init {
        /// Write ~/.colloquy/config.toml instead of printing
        #[arg(short, long)]
        write: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => EngineConfig::load_from(p),
        None => EngineConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

fn init_tracing(config: &EngineConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Init { write } = cli.command {
        return commands::init::run(write);
    }

    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Chat { message, session } => commands::chat::run(config, message, session).await?,
        Commands::Analyze { message } => commands::analyze::run(config, &message).await?,
        Commands::Status => commands::status::run(config).await?,
        Commands::Init { .. } => {}
    }

    Ok(())
}
