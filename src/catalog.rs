//! Book catalog: dataset loading and id lookup.
//!
//! The catalog is loaded once at startup from a JSON file and never
//! mutated afterwards. Summaries are kept exactly as stored in the
//! dataset; every byte handed back to a caller comes straight from
//! this file.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

use crate::matcher;

/// A single catalog entry. `id` is the record's position in the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub id: u32,
    pub title: String,
    pub summary: String,
    pub themes: Vec<String>,
}

/// Shape of one dataset entry on disk.
#[derive(Debug, Deserialize)]
struct RawRecord {
    title: String,
    summary: String,
    #[serde(default)]
    themes: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read dataset {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("record {index}: missing or empty '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("duplicate title (case-insensitive): '{title}'")]
    DuplicateTitle { title: String },
}

/// The immutable in-memory set of book records.
#[derive(Debug)]
pub struct Catalog {
    records: Vec<BookRecord>,
    fingerprint: String,
}

impl Catalog {
    /// Load the catalog from a JSON array of `{title, summary, themes}`.
    ///
    /// Fails on an unreadable file, malformed JSON, a missing or empty
    /// required field, or a duplicate (case-insensitive) title. On any
    /// failure no partial catalog is returned.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let bytes = std::fs::read(path).map_err(|source| CatalogError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;

        let raw: Vec<RawRecord> = serde_json::from_slice(&bytes)?;

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(raw.len());

        for (index, entry) in raw.into_iter().enumerate() {
            if entry.title.trim().is_empty() {
                return Err(CatalogError::MissingField {
                    index,
                    field: "title",
                });
            }
            if entry.summary.trim().is_empty() {
                return Err(CatalogError::MissingField {
                    index,
                    field: "summary",
                });
            }

            let key = matcher::normalize(&entry.title);
            if !seen.insert(key) {
                return Err(CatalogError::DuplicateTitle { title: entry.title });
            }

            records.push(BookRecord {
                id: index as u32,
                title: entry.title,
                summary: entry.summary,
                themes: entry.themes,
            });
        }

        let fingerprint = format!("{:x}", Sha256::digest(&bytes));

        Ok(Self {
            records,
            fingerprint,
        })
    }

    /// Build a catalog from records already in memory.
    ///
    /// The fingerprint is derived from titles and summaries so stale-index
    /// detection works the same as for file-loaded catalogs.
    pub fn from_records(records: Vec<BookRecord>) -> Self {
        let mut hasher = Sha256::new();
        for record in &records {
            hasher.update(record.title.as_bytes());
            hasher.update([0u8]);
            hasher.update(record.summary.as_bytes());
            hasher.update([0u8]);
        }
        let fingerprint = format!("{:x}", hasher.finalize());

        Self {
            records,
            fingerprint,
        }
    }

    pub fn find_by_id(&self, id: u32) -> Option<&BookRecord> {
        self.records.get(id as usize).filter(|r| r.id == id)
    }

    /// All records in dataset order.
    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// SHA-256 hex digest of the dataset this catalog was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_dataset(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_dataset() {
        let file = write_dataset(
            r#"[
                {"title": "Dune", "summary": "A desert planet...", "themes": ["politics", "ecology"]},
                {"title": "1984", "summary": "A dystopia of total surveillance.", "themes": ["surveillance"]}
            ]"#,
        );

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.records()[0].id, 0);
        assert_eq!(catalog.records()[0].title, "Dune");
        assert_eq!(catalog.records()[1].id, 1);
        assert_eq!(catalog.find_by_id(1).unwrap().title, "1984");
        assert!(catalog.find_by_id(7).is_none());
    }

    #[test]
    fn test_summary_preserved_verbatim() {
        let summary = "Line one.\n  Indented line two.\tTabbed.";
        let file = write_dataset(&format!(
            r#"[{{"title": "Odd Whitespace", "summary": {}, "themes": []}}]"#,
            serde_json::to_string(summary).unwrap()
        ));

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.records()[0].summary, summary);
    }

    #[test]
    fn test_duplicate_title_rejected() {
        let file = write_dataset(
            r#"[
                {"title": "Dune", "summary": "First."},
                {"title": "  DUNE ", "summary": "Second."}
            ]"#,
        );

        let err = Catalog::load(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTitle { .. }));
    }

    #[test]
    fn test_missing_summary_rejected() {
        let file = write_dataset(r#"[{"title": "Dune", "summary": "   "}]"#);
        let err = Catalog::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingField {
                field: "summary",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let file = write_dataset("not json at all");
        let err = Catalog::load(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[test]
    fn test_unreadable_path() {
        let err = Catalog::load(Path::new("/nonexistent/books.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Unreadable { .. }));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = write_dataset(r#"[{"title": "Dune", "summary": "A."}]"#);
        let b = write_dataset(r#"[{"title": "Dune", "summary": "B."}]"#);

        let ca = Catalog::load(a.path()).unwrap();
        let cb = Catalog::load(b.path()).unwrap();
        assert_ne!(ca.fingerprint(), cb.fingerprint());
    }
}
