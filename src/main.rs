use clap::{Parser, Subcommand};
use erp_sentinel::Result;
use erp_sentinel::commands::{ask, build_dataset, index_catalog, review, show_status, train};
use erp_sentinel::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "erp-sentinel")]
#[command(about = "Tiered query-resolution engine for ERP support questions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding backend and resolution thresholds
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the FAQ index from the catalog file
    Index {
        /// Path to the FAQ catalog TOML file
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Ask a question and resolve it through the pipeline
    Ask {
        /// The question to resolve; prompts interactively when omitted
        query: Option<String>,
    },
    /// Review low-confidence queries and tag their correct intents
    Review {
        /// Confidence threshold below which records are reviewed
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Regenerate the weekly training dataset from the query log
    Dataset,
    /// Train a new classifier version from the weekly dataset
    Train {
        /// Path to a training dataset CSV (defaults to the weekly dataset)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Show index, model and feedback loop status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Index { catalog } => {
            let config = Config::load()?;
            index_catalog(&config, catalog).await?;
        }
        Commands::Ask { query } => {
            let config = Config::load()?;
            ask(&config, query).await?;
        }
        Commands::Review { threshold } => {
            let config = Config::load()?;
            review(&config, threshold)?;
        }
        Commands::Dataset => {
            let config = Config::load()?;
            build_dataset(&config)?;
        }
        Commands::Train { dataset } => {
            let config = Config::load()?;
            train(&config, dataset)?;
        }
        Commands::Status => {
            let config = Config::load()?;
            show_status(&config).await?;
        }
    }

    Ok(())
}
