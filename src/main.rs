//! # Smart Librarian CLI (`libr`)
//!
//! The `libr` binary is the primary interface for Smart Librarian. It
//! provides commands for querying the catalog, fetching verbatim
//! summaries, and managing the embedding index.
//!
//! ## Usage
//!
//! ```bash
//! libr --config ./config/librarian.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `libr ask "<query>"` | Resolve a request and print the verbatim summary |
//! | `libr chat` | Interactive question loop |
//! | `libr summary "<title>"` | Fetch the exact stored summary for a title |
//! | `libr titles` | List catalog titles and themes |
//! | `libr index build` | Embed all summaries and persist the index |
//! | `libr index status` | Show details of the persisted index |
//!
//! ## Examples
//!
//! ```bash
//! # Exact title match, no network needed
//! libr ask "Dune" --config ./config/librarian.toml
//!
//! # Typo-tolerant lookup
//! libr summary "Dyun" --config ./config/librarian.toml
//!
//! # Build the semantic index (requires an embedding provider)
//! libr index build --config ./config/librarian.toml
//!
//! # Theme query answered via semantic search
//! libr ask "a book about friendship and magic" --config ./config/librarian.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use smart_librarian::{ask, config, index_cmd, summary, titles};

/// Smart Librarian CLI — retrieval-augmented book recommendations with
/// verbatim summaries.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/librarian.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "libr",
    about = "Smart Librarian — retrieval-augmented book lookup with verbatim summaries",
    version,
    long_about = "Smart Librarian resolves free-text requests against a fixed catalog of book \
    summaries via exact matching, fuzzy matching, and semantic search over embeddings, and \
    always returns the stored summary text verbatim."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/librarian.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Resolve a request (title or theme) and print the verbatim summary.
    ///
    /// Tries an exact title match, then fuzzy matching, then semantic
    /// search when an embedding provider is configured. Prompts for a
    /// query when none is given on the command line.
    Ask {
        /// The request text. Multiple words are joined with spaces.
        query: Vec<String>,
    },

    /// Interactive question loop.
    ///
    /// Reads queries from stdin until EOF or `exit`.
    Chat,

    /// Print the exact stored summary for a title.
    ///
    /// Typo-tolerant: falls back to fuzzy matching when the title is
    /// slightly misspelled.
    Summary {
        /// The book title. Multiple words are joined with spaces.
        title: Vec<String>,
    },

    /// List catalog titles and their themes.
    Titles,

    /// Manage the embedding index.
    ///
    /// Requires an embedding provider (OpenAI or Ollama) to be
    /// configured.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
}

/// Index management subcommands.
#[derive(Subcommand)]
enum IndexAction {
    /// Embed every catalog summary and persist the index.
    ///
    /// Skipped when the existing index already matches the dataset.
    Build {
        /// Rebuild even when the index is up to date.
        #[arg(long)]
        force: bool,
    },

    /// Show model, dimensionality, entry count, and staleness of the
    /// persisted index.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask { query } => {
            ask::run_ask(&cfg, query).await?;
        }
        Commands::Chat => {
            ask::run_chat(&cfg).await?;
        }
        Commands::Summary { title } => {
            summary::run_summary(&cfg, &title.join(" "))?;
        }
        Commands::Titles => {
            titles::run_titles(&cfg)?;
        }
        Commands::Index { action } => match action {
            IndexAction::Build { force } => {
                index_cmd::run_index_build(&cfg, force).await?;
            }
            IndexAction::Status => {
                index_cmd::run_index_status(&cfg)?;
            }
        },
    }

    Ok(())
}
