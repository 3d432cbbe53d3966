//! # podrag CLI
//!
//! The `podrag` binary is the primary interface for podrag. It provides
//! commands for building and inspecting the vector index, answering
//! questions from the terminal, and starting the HTTP inference server.
//!
//! ## Usage
//!
//! ```bash
//! podrag --config ./config/podrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `podrag index build` | Build (or load) the persisted vector index |
//! | `podrag index status` | Show what is persisted at the index location |
//! | `podrag corpus` | List the transcript files a build would ingest |
//! | `podrag ask "<question>"` | Answer a question against the index |
//! | `podrag serve` | Start the HTTP inference server |
//!
//! ## Examples
//!
//! ```bash
//! # Embed the corpus and persist the index
//! podrag index build --config ./config/podrag.toml
//!
//! # Rebuild from scratch after the corpus changed
//! podrag index build --force
//!
//! # Ask with streamed output
//! podrag ask --stream "What don't people understand about the semiconductor supply chain?"
//!
//! # Compare against the ungrounded model
//! podrag ask --no-rag "What is Kevin's favorite budgeting software?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use podrag::{ask, config, corpus_cmd, index_cmd, server};

/// podrag: retrieval-augmented question answering for podcast transcripts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/podrag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "podrag",
    about = "Retrieval-augmented question answering for podcast transcripts",
    version,
    long_about = "podrag ingests transcript files, chunks and embeds them into a persisted \
    vector index, and answers questions by retrieving relevant chunks and conditioning a \
    generative model on them, via a CLI and an HTTP inference server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/podrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Manage the persisted vector index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// List the transcript files a build would ingest.
    ///
    /// Scans the corpus root with the configured include/exclude globs
    /// without touching the index or any provider.
    Corpus,

    /// Answer a question against the index.
    ///
    /// Loads the persisted index (building it first if necessary), embeds
    /// the question, retrieves the most relevant transcript chunks, and
    /// asks the generative model.
    Ask {
        /// The question to answer.
        question: String,

        /// Print answer fragments as they arrive instead of waiting for
        /// the full response.
        #[arg(long)]
        stream: bool,

        /// Cap on generated tokens for this question.
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Skip retrieval and ask the model directly.
        #[arg(long)]
        no_rag: bool,
    },

    /// Start the HTTP inference server.
    ///
    /// Builds or loads the index at startup, then serves
    /// `POST /inference/batch` and `POST /inference/stream`.
    Serve,
}

/// Index management subcommands.
#[derive(Subcommand)]
enum IndexAction {
    /// Build the index from the corpus, or load it if already persisted.
    ///
    /// A persisted index is always preferred; nothing is re-embedded
    /// unless `--force` removes it first.
    Build {
        /// Delete the persisted index and rebuild from the corpus.
        #[arg(long)]
        force: bool,
    },

    /// Show what is persisted at the configured index location.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "podrag=info".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { action } => match action {
            IndexAction::Build { force } => {
                index_cmd::run_build(&cfg, force).await?;
            }
            IndexAction::Status => {
                index_cmd::run_status(&cfg)?;
            }
        },
        Commands::Corpus => {
            corpus_cmd::run_corpus(&cfg)?;
        }
        Commands::Ask {
            question,
            stream,
            max_tokens,
            no_rag,
        } => {
            ask::run_ask(&cfg, &question, stream, max_tokens, no_rag).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
