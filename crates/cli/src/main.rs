//! Cover Type prediction CLI
//!
//! A command-line client for requesting predictions, listing the
//! available strategies, and checking service health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, options, predict};
use std::path::PathBuf;

/// Cover Type prediction CLI
#[derive(Parser)]
#[command(name = "covtype")]
#[command(author, version, about = "CLI for the Cover Type prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via COVTYPE_API_URL env var)
    #[arg(long, env = "COVTYPE_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the cover type of one sample
    Predict {
        /// Strategy id (1-4) or name (heuristic, random-forest, logistic-regression, neural-network)
        #[arg(long, short)]
        option: Option<String>,

        /// Comma separated feature values in dataset column order
        #[arg(long, short, conflicts_with = "input_file")]
        input: Option<String>,

        /// File holding the feature values
        #[arg(long)]
        input_file: Option<PathBuf>,
    },

    /// List the available prediction strategies
    Options,

    /// Show service health
    Health,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;

    match cli.command {
        Commands::Predict {
            option,
            input,
            input_file,
        } => {
            let option = option
                .or(config.default_option)
                .ok_or_else(|| anyhow::anyhow!("No option given (--option)"))?;
            let features = predict::read_features(input, input_file.as_deref())?;
            predict::predict(&client, &option, features, cli.format).await?;
        }
        Commands::Options => {
            options::list_options(&client, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
