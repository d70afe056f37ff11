//! CLI entry point for Compass Assist.
//!
//! This binary provides the `compass` command with subcommands for running
//! a demo REPL against a seeded mock page, parsing a single utterance, and
//! checking configuration.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use compass_classifier::{ClassifierConfig, HttpClassifier};
use compass_engine::{CommandParser, EngineConfig, Orchestrator};

mod demo;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Compass Assist — natural-language command engine.
#[derive(Parser)]
#[command(
    name = "compass",
    version,
    about = "Compass Assist — natural-language command engine",
    long_about = "Interprets voice/text commands (\"click sign up\", \"my email is ...\") \
                  and executes them against a UI surface, with guided multi-step flows \
                  for signing up and signing in."
)]
struct Cli {
    /// Path to an engine configuration TOML file.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a demo REPL against a seeded mock auth page.
    Repl,

    /// Parse one utterance and print the structured intent as JSON.
    Parse {
        /// The utterance to parse.
        text: Vec<String>,
    },

    /// Show engine configuration and classifier wiring.
    Status,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Repl => cmd_repl(config).await,
        Commands::Parse { text } => cmd_parse(&text.join(" ")),
        Commands::Status => cmd_status(config, cli.config.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: repl
// ---------------------------------------------------------------------------

async fn cmd_repl(config: EngineConfig) -> Result<()> {
    init_tracing("warn");

    let surface = demo::auth_page();
    let mut orchestrator = Orchestrator::new(surface, config);

    // Remote fallback is optional; the engine degrades to local-only.
    if let Ok(endpoint) = std::env::var("COMPASS_CLASSIFIER_URL") {
        let mut classifier_config = ClassifierConfig::new(endpoint.clone());
        if let Ok(key) = std::env::var("COMPASS_CLASSIFIER_KEY") {
            classifier_config = classifier_config.with_api_key(key);
        }
        let classifier =
            HttpClassifier::new(classifier_config).context("failed to build classifier client")?;
        orchestrator = orchestrator.with_classifier(Arc::new(classifier));
        info!(endpoint = %endpoint, "remote classifier attached");
    }

    println!();
    println!("  Compass Assist v{}", env!("CARGO_PKG_VERSION"));
    println!("  A demo auth page is loaded.");
    println!("  Try: \"sign me up\", \"click sign up\", \"scroll down\", \"help\".");
    println!("  Type 'decisions' for recent decisions, 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if reader.read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }
        if trimmed == "decisions" {
            for record in orchestrator.recent_decisions() {
                println!(
                    "  [{}] {:?} {:.2}  \"{}\"  -> {}",
                    record.action, record.source, record.confidence, record.utterance, record.reply
                );
            }
            continue;
        }

        // One utterance at a time: the reply is awaited before the next
        // prompt, so a command can never race the one before it.
        let reply = orchestrator.process_utterance(trimmed).await;
        println!("  {}", reply.reply);

        let status = orchestrator.workflow_status();
        if status.active {
            println!(
                "  [{} — step {}/{}]",
                status.name.as_deref().unwrap_or("flow"),
                status.step,
                status.total_steps
            );
        }
    }

    info!("shutting down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: parse
// ---------------------------------------------------------------------------

fn cmd_parse(text: &str) -> Result<()> {
    init_tracing("warn");

    if text.trim().is_empty() {
        anyhow::bail!("nothing to parse: pass an utterance, e.g. `compass parse click sign up`");
    }

    let parser = CommandParser::new();
    let parsed = parser.parse(text);
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(config: EngineConfig, config_path: Option<&Path>) -> Result<()> {
    init_tracing("warn");

    println!();
    println!("  Compass Assist Status");
    println!("  =====================");
    println!();

    match config_path {
        Some(path) => println!("  Config:      {}", path.display()),
        None => println!("  Config:      built-in defaults"),
    }
    println!("  Confidence:  execute >= {}, remote < {}", config.high_confidence, config.low_confidence);
    println!("  Wait bound:  {} ms", config.wait_timeout_ms);

    match std::env::var("COMPASS_CLASSIFIER_URL") {
        Ok(endpoint) => println!("  Classifier:  {endpoint}"),
        Err(_) => println!("  Classifier:  NOT SET (local-only; export COMPASS_CLASSIFIER_URL)"),
    }

    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            EngineConfig::from_toml_str(&raw)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Initialize the tracing subscriber with the given default log level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
