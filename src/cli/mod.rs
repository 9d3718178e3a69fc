pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "jobly")]
#[command(about = "Jobly CLI - administration for the Jobly API database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Load sample companies and jobs")]
    Seed,

    #[command(about = "User management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Issue a token for an existing user")]
    Token {
        #[arg(help = "Username")]
        username: String,
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

/// Configuration and pool shared by every command.
pub struct CliContext {
    pub config: AppConfig,
    pub pool: PgPool,
}

impl CliContext {
    pub async fn connect() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let pool = DatabaseManager::connect(&config.database).await?;
        Ok(Self { config, pool })
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let ctx = CliContext::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::handle(&ctx, output_format).await,
        Commands::Seed => commands::seed::handle(&ctx, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, &ctx, output_format).await,
        Commands::Token { username } => commands::token::handle(&username, &ctx, output_format).await,
    }
}
