//! The `titles` command: list the catalog.

use anyhow::Result;

use crate::catalog::Catalog;
use crate::config::Config;

pub fn run_titles(config: &Config) -> Result<()> {
    let catalog = Catalog::load(&config.catalog.path)?;

    println!("{} books in catalog", catalog.len());
    for record in catalog.records() {
        if record.themes.is_empty() {
            println!("  {}", record.title);
        } else {
            println!("  {:<32} {}", record.title, record.themes.join(", "));
        }
    }

    Ok(())
}
