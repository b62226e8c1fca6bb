use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sop_finder::Result;
use sop_finder::commands::{ask, chat, ingest, init_config, show_config, show_status};
use sop_finder::config::Config;

#[derive(Parser)]
#[command(name = "sop-finder")]
#[command(about = "Retrieval-augmented search and Q&A over standard operating procedure manuals")]
#[command(version)]
struct Cli {
    /// Path to the configuration file (defaults to ./sop-finder.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from a directory of PDF procedure manuals
    Ingest {
        /// Directory containing the PDF files (overrides the configured data dir)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Ask a single question against the indexed procedures
    Ask {
        /// The question text
        question: String,
    },
    /// Start an interactive question loop
    Chat,
    /// Show credential, configuration and index status
    Status,
    /// Manage configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { data_dir } => {
            ingest(config, data_dir).await?;
        }
        Commands::Ask { question } => {
            ask(config, &question).await?;
        }
        Commands::Chat => {
            chat(config).await?;
        }
        Commands::Status => {
            show_status(config).await?;
        }
        Commands::Config { show, init } => {
            if init {
                init_config(&config)?;
            } else if show {
                show_config(&config)?;
            } else {
                println!("Use --show to print the configuration or --init to write a default file.");
            }
        }
    }

    Ok(())
}
