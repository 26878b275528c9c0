use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use zenflow_core::backup::ImportMode;
use zenflow_core::models::MoodType;

#[derive(Parser)]
#[command(name = "zenflow", version, about = "Back up and sync your ZenFlow wellness data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Local database file (defaults to ZENFLOW_DB_PATH, then the data dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Profile holding the Supabase endpoint and session
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a mood check-in
    Mood {
        /// great, good, okay, bad or terrible
        #[arg(value_parser = parse_mood)]
        mood: MoodType,
        /// Optional note
        note: Vec<String>,
    },
    /// Add a gratitude journal entry
    Gratitude {
        /// Entry text
        text: Vec<String>,
    },
    /// Show per-collection record counts
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a full backup
    Export {
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a backup file
    Import {
        /// Backup file to read
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Merge)]
        mode: ModeArg,
        /// Output the import report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull, merge and push the cloud backup now
    Sync {
        #[arg(long, value_enum, default_value_t = ModeArg::Merge)]
        mode: ModeArg,
    },
    /// Keep syncing in the background until interrupted
    Watch,
    /// Print a completion script for a shell
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Write the script here instead of stdout
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in to cloud sync
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    /// Upsert by primary key, keep local-only records
    Merge,
    /// Clear every collection before writing
    Replace,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Merge => Self::Merge,
            ModeArg::Replace => Self::Replace,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the selected profile
    Init {
        /// Project URL, e.g. https://abc.supabase.co
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Public anon key of the project
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Turn cloud sync on for this profile
        #[arg(long, conflicts_with = "disable_sync")]
        enable_sync: bool,
        /// Turn cloud sync off for this profile
        #[arg(long)]
        disable_sync: bool,
        /// Leave the active profile unchanged
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password; the session goes to the OS keychain
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show who is signed in
    Status,
    /// Sign out and forget the stored session
    Logout,
}

fn parse_mood(value: &str) -> Result<MoodType, String> {
    value.parse()
}
