//! Redpost CLI - topic in, published note out
//!
//! Generates a note through the model pipeline, opens a preview for review,
//! and publishes immediately or at a scheduled time.

mod commands;
mod output;
mod prompt;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redpost::RedpostConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::PublishArgs;
use crate::output::OutputHandler;

/// Redpost - generate, preview and publish social notes
#[derive(Parser)]
#[command(name = "redpost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate a social note from a topic, review it and publish it")]
#[command(long_about = r#"
Redpost turns a short topic into a finished note (title, body, tags, images),
shows you a preview and publishes it now or at a time you choose.

Examples:
  redpost publish                              # Interactive mode
  redpost publish -t "AI写作工具" -w 500        # Topic from the command line
  redpost publish -t "早起习惯" --quick          # Skip the preview
  redpost history -n 5                         # Last five publishes
  redpost config --set llm.api_key=<key>       # Store the API key
"#)]
struct Cli {
    /// Config file (defaults to ~/.redpost/config.toml)
    #[arg(long, global = true, env = "REDPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and publish a note
    Publish {
        /// Topic of the note
        #[arg(short, long)]
        topic: Option<String>,

        /// Target accounts (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        accounts: Vec<String>,

        /// Target body length
        #[arg(short, long)]
        word_count: Option<u32>,

        /// Background information for the writer
        #[arg(short, long)]
        context: Option<String>,

        /// Skip the preview and publish immediately
        #[arg(short, long, conflicts_with = "generate_only")]
        quick: bool,

        /// Stop after generating, do not publish
        #[arg(short, long)]
        generate_only: bool,
    },

    /// Show publish history
    History {
        /// Number of records to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Show totals instead of records
        #[arg(long)]
        summary: bool,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set a configuration value (key=value)
        #[arg(long)]
        set: Option<String>,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(verbose: bool, config: &RedpostConfig) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };

    let file_layer = if config.logging.log_to_file {
        std::fs::create_dir_all(&config.storage.output_dir)?;
        let log_path = config.storage.output_dir.join("app.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Cannot open {}", log_path.display()))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("redpost={0},redpost_cli={0},warn", log_level).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(RedpostConfig::config_path);

    // Config commands work on the file itself
    if let Commands::Config { show, set, init } = &cli.command {
        if *init {
            commands::init_config(&config_path)?;
        }
        if let Some(kv) = set {
            commands::set_config(&config_path, kv)?;
        }
        if *show || (!*init && set.is_none()) {
            let config = RedpostConfig::load(Some(&config_path))?;
            commands::show_config(&config, &config_path)?;
        }
        return Ok(());
    }

    let config = RedpostConfig::load(Some(&config_path))
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    init_tracing(cli.verbose, &config)?;

    match cli.command {
        Commands::Publish {
            topic,
            accounts,
            word_count,
            context,
            quick,
            generate_only,
        } => {
            let args = PublishArgs {
                topic,
                accounts,
                word_count,
                context,
                quick,
                generate_only,
            };
            commands::publish(&config, args).await
        }
        Commands::History { limit, summary } => commands::history(&config, limit, summary).await,
        Commands::Config { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        OutputHandler::new().print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
