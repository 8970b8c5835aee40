//! # Context Gate CLI (`cgate`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cgate init` | Create the SQLite database and run schema migrations |
//! | `cgate ingest` | Chunk, embed and index documents under `[ingest].root` |
//! | `cgate retrieve "<q>"` | Show raw vector matches for a question |
//! | `cgate ask "<q>"` | Answer a question through the full pipeline |
//! | `cgate stats` | Show document and fragment counts |
//! | `cgate reset` | Remove every indexed fragment |
//! | `cgate serve` | Start the HTTP chat server |
//!
//! ## Examples
//!
//! ```bash
//! cgate init --config ./config/cgate.toml
//! cgate ingest
//! cgate ask "What is the notice period?" --policy fail_closed
//! RUST_LOG=debug cgate retrieve "notice period" --top-k 5
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use context_gate::{answer, config, ingest, logging, migrate, server, stats};
use context_gate_core::Policy;

/// Context Gate: retrieval-augmented answering with relevance gating.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cgate.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cgate",
    about = "Context Gate: retrieval-augmented answering with relevance gating",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cgate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Index documents from `[ingest].root`.
    ///
    /// Unchanged documents (same content hash and chunking strategy) are
    /// skipped unless `--full` is given.
    Ingest {
        /// Re-index every document.
        #[arg(long)]
        full: bool,

        /// Show document and fragment counts without writing.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of fragments to store in this run.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the nearest fragments for a question, before re-ranking.
    Retrieve {
        question: String,

        /// Number of candidates (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer a question.
    Ask {
        question: String,

        /// Fallback policy: `fail_closed`, `fail_open` or `hybrid`.
        #[arg(long)]
        policy: Option<Policy>,
    },

    /// Show index statistics.
    Stats,

    /// Delete all fragments and document records.
    Reset,

    /// Start the HTTP chat server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            full,
            dry_run,
            limit,
        } => {
            ingest::run_ingest(
                &cfg,
                ingest::IngestOptions {
                    full,
                    dry_run,
                    limit,
                },
            )
            .await?;
        }
        Commands::Retrieve { question, top_k } => {
            answer::run_retrieve(&cfg, &question, top_k).await?;
        }
        Commands::Ask { question, policy } => {
            answer::run_ask(&cfg, &question, policy).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Reset => {
            stats::run_reset(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
