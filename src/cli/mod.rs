pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "daliyuan")]
#[command(about = "Daliyuan CLI - database maintenance for the storefront API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create tables and indexes")]
    Migrate,

    #[command(about = "Replace users, categories, products and orders with the bundled sample data")]
    Seed {
        #[arg(long, short = 'd', help = "Only delete existing data")]
        destroy: bool,
    },

    #[command(about = "Inspect and clean up orders")]
    Orders {
        #[command(subcommand)]
        cmd: commands::orders::OrderCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Seed { destroy } => commands::seed::handle(destroy, output_format).await,
        Commands::Orders { cmd } => commands::orders::handle(cmd, output_format).await,
    }
}
