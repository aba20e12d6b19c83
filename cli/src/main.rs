//! Tally CLI - binary entry point.
//!
//! Parses the command line, loads `~/.tally/config.toml`, builds the ledger
//! client and hands off to [`commands`]. Logs go to a file so they never
//! interleave with command output.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tally_engine::TallyConfig;

/// Split shared expenses and settle up.
#[derive(Parser)]
#[command(name = "tally", version, about)]
struct Cli {
    /// Path to the configuration file (default: ~/.tally/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ledger base URL (overrides config and TALLY_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Acting user id (overrides [session] user_id)
    #[arg(long, global = true, env = "TALLY_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and print the bearer token for TALLY_TOKEN
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List your groups
    Groups,
    /// Create, rename, delete or grow a group
    #[command(subcommand)]
    Group(GroupCommand),
    /// Look users up by email
    Search { query: String },
    /// Record a shared expense
    #[command(subcommand)]
    Expense(ExpenseCommand),
    /// Expense history
    Expenses {
        /// Only expenses whose description contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Totals across all your expenses
    Dashboard,
    /// Outstanding transactions for a group
    Settlements {
        #[arg(long)]
        group: Option<String>,
    },
    /// Confirm the transaction at INDEX (as listed by `settlements`)
    Settle {
        index: usize,
        #[arg(long)]
        group: Option<String>,
    },
    /// Acknowledge a reminder for the transaction at INDEX
    Remind {
        index: usize,
        #[arg(long)]
        group: Option<String>,
    },
}

#[derive(Subcommand)]
enum GroupCommand {
    /// Create a group; members are looked up by email
    Create {
        name: String,
        #[arg(short, long = "member")]
        members: Vec<String>,
    },
    Rename { group: String, name: String },
    /// Delete a group and all of its expenses
    Delete {
        group: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Add a member by email
    AddMember { group: String, email: String },
}

#[derive(Subcommand)]
enum ExpenseCommand {
    /// Split an amount equally between you and the selected members
    Add {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        description: String,
        /// Group id (default: your first group)
        #[arg(long)]
        group: Option<String>,
        /// Leave this member out of the split (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_tally_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay quiet rather than mixing logs into command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_tally_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in tally_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn tally_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.tally/logs/tally.log
    if let Some(config_path) = TallyConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("tally.log"));
    }

    // Fallback: ./.tally/logs/tally.log
    candidates.push(PathBuf::from(".tally").join("logs").join("tally.log"));

    candidates
}

fn load_config(cli: &Cli) -> Result<TallyConfig> {
    let loaded = match &cli.config {
        Some(path) => TallyConfig::load_from(path),
        None => TallyConfig::load(),
    };
    let mut config = loaded
        .context("could not load configuration")?
        .unwrap_or_default();
    config.apply_env_overrides();
    if let Some(url) = &cli.base_url {
        config.ledger.get_or_insert_with(Default::default).base_url = Some(url.clone());
    }
    if let Some(user) = &cli.user {
        config.session.get_or_insert_with(Default::default).user_id = Some(user.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let result = commands::run(cli.command, &config).await;
    if let Err(err) = &result {
        tracing::warn!(error = %format!("{err:#}"), "Command failed");
    }
    result
}
