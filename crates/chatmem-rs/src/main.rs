//! Inspect and drive short-term memory windows from the command line.
//!
//! Output is JSON on stdout; logs go to stderr (`RUST_LOG`, default `info`).
//!
//! # Examples
//!
//! ```sh
//! # Record a turn, promoting overflow to the configured backend
//! chatmem --config memory.json turn --session tg:42 --user "hi" --assistant "hello"
//!
//! # Replay a window as chat messages
//! chatmem --data-dir data context --session tg:42
//!
//! # Dump the stored window with tags and sequence numbers
//! chatmem show --session tg:42
//!
//! # Search long-term memory
//! chatmem --config memory.json recall --session tg:42 --query "pets" --limit 3
//! ```

use chatmem_rs::config::MemoryConfig;
use chatmem_rs::memory::ShortTermMemory;
use chatmem_rs::window::entries_to_context_messages;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Inspect and drive short-term memory windows.
#[derive(Parser)]
#[command(name = "chatmem", version)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum active entries per window (overrides the config file)
    #[arg(long, global = true)]
    capacity: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one user/assistant exchange
    Turn {
        #[arg(long)]
        session: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        assistant: String,
    },
    /// Print the window as chat messages
    Context {
        #[arg(long)]
        session: String,
        /// Skip entries waiting for promotion
        #[arg(long)]
        active_only: bool,
    },
    /// Print the stored window
    Show {
        #[arg(long)]
        session: String,
    },
    /// Search long-term memory
    Recall {
        #[arg(long)]
        session: String,
        #[arg(long)]
        query: String,
        /// Maximum results (default: search_limit from the config)
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn load_config(cli: &Cli) -> Result<MemoryConfig, String> {
    let mut config = match &cli.config {
        Some(path) => MemoryConfig::from_file(path).map_err(|e| e.to_string())?,
        None => MemoryConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(capacity) = cli.capacity {
        config = config.with_capacity(capacity);
    }
    Ok(config)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode output: {e}"))
}

async fn run(cli: &Cli) -> Result<String, String> {
    let config = load_config(cli)?;
    let memory = ShortTermMemory::from_config(&config).map_err(|e| e.to_string())?;

    match &cli.command {
        Command::Turn {
            session,
            user,
            assistant,
        } => {
            let report = memory
                .process_turn(session, user, assistant)
                .await
                .map_err(|e| e.to_string())?;
            to_json(&report)
        }
        Command::Context {
            session,
            active_only,
        } => {
            let messages = if *active_only {
                let window = memory.load_window(session).await;
                entries_to_context_messages(window.active_entries())
            } else {
                memory.get_context_messages(session).await
            };
            to_json(&messages)
        }
        Command::Show { session } => to_json(&memory.load_window(session).await),
        Command::Recall {
            session,
            query,
            limit,
        } => {
            if !memory.long_term().is_enabled() {
                return Err("long-term memory is not configured (set `long_term` in --config)".into());
            }
            let limit = limit.unwrap_or(config.search_limit);
            to_json(&memory.recall(session, query, limit).await)
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
