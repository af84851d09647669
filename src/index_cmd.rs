//! Embedding index management: the `index build` and `index status`
//! commands.
//!
//! Unlike the best-effort index handling in the query router, `index
//! build` was asked for explicitly, so backend failures here are fatal.

use anyhow::{bail, Result};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::embedding;
use crate::index::EmbeddingIndex;

/// Build (or refresh) the persisted index.
pub async fn run_index_build(config: &Config, force: bool) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let backend = embedding::create_backend(&config.embedding)?
        .ok_or_else(|| anyhow::anyhow!("Embedding provider is disabled"))?;
    let catalog = Catalog::load(&config.catalog.path)?;

    if !force {
        if let Ok(existing) =
            EmbeddingIndex::load(&config.index.path, backend.model_name(), backend.dims())
        {
            if !existing.is_stale(&catalog) {
                println!("index build");
                println!("  index is up to date ({} entries)", existing.len());
                println!("  use --force to rebuild anyway");
                return Ok(());
            }
        }
    }

    let index =
        EmbeddingIndex::build(&catalog, backend.as_ref(), config.embedding.batch_size).await?;
    index.save(&config.index.path)?;

    println!("index build");
    println!("  indexed: {}", index.len());
    println!("  model: {}", index.model());
    println!("  dims: {}", index.dims());
    println!("  path: {}", config.index.path.display());

    Ok(())
}

/// Inspect the persisted index file.
pub fn run_index_status(config: &Config) -> Result<()> {
    println!("index status");
    println!("  path: {}", config.index.path.display());

    if !config.embedding.is_enabled() {
        println!("  embedding provider: disabled");
        println!(
            "  index file present: {}",
            config.index.path.exists()
        );
        return Ok(());
    }

    let model = config.embedding.model.as_deref().unwrap_or("");
    let dims = config.embedding.dims.unwrap_or(0);

    match EmbeddingIndex::load(&config.index.path, model, dims) {
        Ok(index) => {
            let catalog = Catalog::load(&config.catalog.path)?;
            println!("  model: {}", index.model());
            println!("  dims: {}", index.dims());
            println!("  entries: {}", index.len());
            println!("  created: {}", format_ts_iso(index.created_at()));
            println!(
                "  stale: {}",
                if index.is_stale(&catalog) { "yes (dataset changed, rebuild with `libr index build`)" } else { "no" }
            );
        }
        Err(e) => {
            println!("  index unreadable: {}", e);
            println!("  rebuild with `libr index build`");
        }
    }

    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
