//! emrtree - EMR tree ledger CLI
//!
//! Caller layer for the branch ledger: supplies the caller identity,
//! derives content hashes, and drives the core's write and read
//! operations. Contains no ledger logic of its own.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use emrtree_core::{EventBuffer, Ledger};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// emrtree - EMR tree ledger
#[derive(Parser, Debug)]
#[command(name = "emrtree")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the ledger database
    #[arg(long, default_value = "emrtree.db")]
    db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Write operations ===
    /// Create the caller's genesis branch
    Genesis {
        /// Caller identity
        #[arg(long)]
        owner: String,

        /// Record metadata text
        metadata: String,

        /// Content hash as 64 hex chars (derived from metadata if omitted)
        #[arg(long)]
        hash: Option<String>,
    },

    /// Append a block to a branch the caller owns
    Append {
        /// Caller identity
        #[arg(long)]
        owner: String,

        /// Branch id to append to
        branch: u64,

        /// Record metadata text
        metadata: String,

        /// Content hash as 64 hex chars (derived from metadata if omitted)
        #[arg(long)]
        hash: Option<String>,
    },

    /// Fork a new branch from a block of a branch the caller owns
    Fork {
        /// Caller identity
        #[arg(long)]
        owner: String,

        /// Parent branch id
        branch: u64,

        /// Parent block index within the branch
        index: u64,

        /// Record metadata text
        metadata: String,

        /// Content hash as 64 hex chars (derived from metadata if omitted)
        #[arg(long)]
        hash: Option<String>,
    },

    // === Read operations ===
    /// List branch ids created by an owner
    Branches {
        /// Owner identity
        owner: String,
    },

    /// Print all blocks of a branch as JSON
    Show {
        /// Branch id
        branch: u64,
    },

    /// Print one block as JSON
    Block {
        /// Branch id
        branch: u64,

        /// Block index within the branch
        index: u64,
    },

    /// Audit hash-chain linkage across the whole ledger
    Verify,

    /// Print ledger statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut ledger = Ledger::open(&cli.db)
        .with_context(|| format!("failed to open ledger at {}", cli.db.display()))?;
    tracing::debug!(db = %cli.db.display(), "ledger opened");

    // Echo emitted notifications after each write, the way an indexer or
    // UI layer would consume them.
    let events = EventBuffer::shared();
    ledger.subscribe(events.clone());

    match cli.command {
        Commands::Genesis {
            owner,
            metadata,
            hash,
        } => commands::genesis(&ledger, &events, &owner, &metadata, hash.as_deref()),
        Commands::Append {
            owner,
            branch,
            metadata,
            hash,
        } => commands::append(&ledger, &events, &owner, branch, &metadata, hash.as_deref()),
        Commands::Fork {
            owner,
            branch,
            index,
            metadata,
            hash,
        } => commands::fork(
            &ledger,
            &events,
            &owner,
            branch,
            index,
            &metadata,
            hash.as_deref(),
        ),
        Commands::Branches { owner } => commands::branches(&ledger, &owner),
        Commands::Show { branch } => commands::show(&ledger, branch),
        Commands::Block { branch, index } => commands::block(&ledger, branch, index),
        Commands::Verify => commands::verify(&ledger),
        Commands::Stats => commands::stats(&ledger),
    }
}
