//! ZenFlow CLI - back up, restore and cloud-sync wellness data
//!
//! Hosts the sync core against an on-disk store, a keychain-held Supabase
//! session and named JSON profiles.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::capture::{run_gratitude, run_mood};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::export::{run_export, run_import};
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, run_watch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "zenflow=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    let db_path = cli.db_path;

    match cli.command {
        Commands::Mood { mood, note } => {
            run_mood(mood, &note, &resolve_db_path(db_path)?).await?;
        }
        Commands::Gratitude { text } => {
            run_gratitude(&text, &resolve_db_path(db_path)?).await?;
        }
        Commands::Status { json } => run_status(json, &resolve_db_path(db_path)?).await?,
        Commands::Export { output } => {
            run_export(output.as_deref(), &resolve_db_path(db_path)?).await?;
        }
        Commands::Import { path, mode, json } => {
            run_import(&path, mode.into(), json, &resolve_db_path(db_path)?).await?;
        }
        Commands::Sync { mode } => {
            run_sync(mode.into(), profile, &resolve_db_path(db_path)?).await?;
        }
        Commands::Watch => run_watch(profile, &resolve_db_path(db_path)?).await?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile).await?,
    }

    Ok(())
}
