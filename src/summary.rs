//! The `summary` command: direct verbatim summary lookup by title.
//!
//! Needs no embedding backend: exact and fuzzy title matching resolve
//! entirely in memory.

use anyhow::Result;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::retriever::Retriever;
use crate::tools::ToolContext;

pub fn run_summary(config: &Config, title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        println!("Please provide a title.");
        return Ok(());
    }

    let catalog = Arc::new(Catalog::load(&config.catalog.path)?);
    let retriever = Arc::new(Retriever::new(catalog, config.matching.clone(), None));
    let ctx = ToolContext::new(retriever);

    match ctx.summary_by_title(title) {
        Ok(hit) => {
            println!("{}", hit.title);
            println!();
            println!("{}", hit.summary);
        }
        Err(e) => {
            println!("No match found in the catalog: {}", e);
        }
    }

    Ok(())
}
