//! Query router: the `ask` and `chat` commands.
//!
//! Wires the retriever's result back to the user: exact and fuzzy hits
//! print the verbatim stored summary directly; semantic hits are
//! optionally handed to the assistant, which picks one candidate, and
//! the summary shown is still fetched through the verbatim tool path.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::assistant;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::embedding::{self, EmbeddingBackend};
use crate::index::{EmbeddingIndex, IndexFileError};
use crate::retriever::{RetrievalResult, Retriever, SemanticMatch};
use crate::tools::{ToolContext, ToolRegistry};

/// Build the shared retriever for this process.
///
/// Loads the catalog (fatal on failure, no partial catalog is served)
/// and, when embeddings are enabled, loads or rebuilds the persisted
/// index. Index problems are never fatal here: a corrupt or stale file
/// triggers a rebuild, and a rebuild failure leaves tiers 1–2 serving.
pub async fn prepare_retriever(config: &Config) -> Result<Arc<Retriever>> {
    let catalog = Arc::new(Catalog::load(&config.catalog.path)?);
    let backend = embedding::create_backend(&config.embedding)?;
    let retriever = Arc::new(Retriever::new(
        catalog,
        config.matching.clone(),
        backend.clone(),
    ));

    if let Some(backend) = backend {
        match EmbeddingIndex::load(&config.index.path, backend.model_name(), backend.dims()) {
            Ok(index) if index.is_stale(retriever.catalog()) => {
                tracing::warn!("embedding index is stale, rebuilding");
                rebuild_and_publish(config, &retriever, backend.as_ref()).await;
            }
            Ok(index) => retriever.publish_index(Arc::new(index)),
            Err(IndexFileError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "no embedding index at {}, building one",
                    config.index.path.display()
                );
                rebuild_and_publish(config, &retriever, backend.as_ref()).await;
            }
            Err(e) => {
                tracing::warn!("cannot load embedding index ({}), rebuilding", e);
                rebuild_and_publish(config, &retriever, backend.as_ref()).await;
            }
        }
    }

    Ok(retriever)
}

/// Best-effort rebuild; on failure the semantic tier stays dark.
async fn rebuild_and_publish(
    config: &Config,
    retriever: &Retriever,
    backend: &dyn EmbeddingBackend,
) {
    match EmbeddingIndex::build(retriever.catalog(), backend, config.embedding.batch_size).await {
        Ok(index) => {
            if let Err(e) = index.save(&config.index.path) {
                tracing::warn!("failed to persist embedding index: {}", e);
            }
            retriever.publish_index(Arc::new(index));
        }
        Err(e) => {
            tracing::warn!("embedding index rebuild failed, semantic tier disabled: {}", e)
        }
    }
}

/// One-shot query. Prompts on a TTY when no query was given.
pub async fn run_ask(config: &Config, query_args: Vec<String>) -> Result<()> {
    let query = if query_args.is_empty() {
        prompt_for_query()?
    } else {
        query_args.join(" ")
    };
    let query = query.trim().to_string();

    if query.is_empty() {
        println!("Please provide a non-empty query.");
        return Ok(());
    }

    let retriever = prepare_retriever(config).await?;
    handle_query(config, &retriever, &query).await
}

/// Interactive loop. EOF, `exit`, or `quit` leaves.
pub async fn run_chat(config: &Config) -> Result<()> {
    let retriever = prepare_retriever(config).await?;
    let interactive = atty::is(atty::Stream::Stdin);

    if interactive {
        println!("Smart Librarian — ask for a book by title or theme. Type 'exit' to quit.");
    }

    let stdin = std::io::stdin();
    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        handle_query(config, &retriever, query).await?;
        println!();
    }

    Ok(())
}

fn prompt_for_query() -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        print!("Ask for a book (title or theme): ");
        std::io::stdout().flush()?;
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

/// Route one query through the retriever and print the outcome.
pub async fn handle_query(config: &Config, retriever: &Arc<Retriever>, query: &str) -> Result<()> {
    match retriever.resolve(query).await {
        RetrievalResult::Exact(record) => {
            println!("=== Title Match ===");
            println!("{}", record.title);
            print_summary(&record.summary);
        }
        RetrievalResult::Fuzzy(candidates) => {
            println!("=== Close Matches ===");
            for (i, candidate) in candidates.iter().enumerate() {
                println!("{}. [{:.2}] {}", i + 1, candidate.score, candidate.record.title);
            }

            let best = &candidates[0];
            println!();
            println!("Best match: {}", best.record.title);
            print_summary(&best.record.summary);
        }
        RetrievalResult::Semantic(candidates) => {
            display_semantic(config, retriever, query, &candidates).await?;
        }
        RetrievalResult::Empty => {
            println!("No match found in the catalog.");
        }
    }

    Ok(())
}

async fn display_semantic(
    config: &Config,
    retriever: &Arc<Retriever>,
    query: &str,
    candidates: &[SemanticMatch],
) -> Result<()> {
    println!("No direct title match. Showing semantic matches.");
    println!("=== Semantic Matches ===");
    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "{}. [distance {:.3}] {}",
            i + 1,
            candidate.distance,
            candidate.record.title
        );
    }

    let mut chosen = 0usize;

    if config.assistant.is_enabled() {
        let registry = ToolRegistry::with_builtins();
        let ctx = ToolContext::new(retriever.clone());
        match assistant::run_assistant(&config.assistant, &registry, &ctx, query).await {
            Ok(reply) => {
                println!();
                println!("=== Recommendation ===");
                println!("{}", reply);

                let titles: Vec<String> = candidates
                    .iter()
                    .map(|c| c.record.title.clone())
                    .collect();
                if let Some(index) = assistant::choose_title(&reply, &titles) {
                    chosen = index;
                }
            }
            Err(e) => {
                tracing::warn!("assistant unavailable, falling back to nearest match: {}", e)
            }
        }
    }

    let best = &candidates[chosen];
    println!();
    println!("Recommended: {}", best.record.title);
    print_summary(&best.record.summary);

    Ok(())
}

fn print_summary(summary: &str) {
    println!();
    println!("=== Summary (verbatim) ===");
    println!("{}", summary);
}
