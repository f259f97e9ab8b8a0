//! FinOps hub CLI
//!
//! A command-line tool for fetching savings reports and listing the
//! resources and projects the hub can see.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inventory, report};

/// FinOps hub CLI
#[derive(Parser)]
#[command(name = "finops")]
#[command(author, version, about = "CLI for the FinOps cost-optimization hub", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FINOPS_API_URL env var)
    #[arg(long, env = "FINOPS_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the savings report for a project across zones
    Report {
        /// Project ID (defaults to default_project from the config file)
        #[arg(long, short)]
        project: Option<String>,

        /// Comma-separated zones, e.g. us-central1-a,us-central1-b
        #[arg(long, short)]
        zones: String,
    },

    /// List project resources
    Resources {
        /// Project ID (defaults to default_project from the config file)
        #[arg(long, short)]
        project: Option<String>,

        /// Only show resources in these zones (and their regions)
        #[arg(long, short)]
        zones: Option<String>,
    },

    /// List accessible projects
    Projects,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::from_name)
        })
        .unwrap_or_default();

    // Initialize client
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;

    // Execute command
    match cli.command {
        Commands::Report { project, zones } => {
            let project = config.resolve_project(project)?;
            report::show_report(&client, &project, &zones, format).await?;
        }
        Commands::Resources { project, zones } => {
            let project = config.resolve_project(project)?;
            inventory::list_resources(&client, &project, zones.as_deref(), format).await?;
        }
        Commands::Projects => {
            inventory::list_projects(&client, format).await?;
        }
    }

    Ok(())
}
