//! Exact and fuzzy title resolution against the catalog.
//!
//! Both lookups operate on normalized titles (lowercased, whitespace
//! collapsed). Fuzzy similarity is normalized Levenshtein, so scores
//! land in [0, 1] and a configured threshold cuts off weak candidates.
//! Callers must try [`TitleMatcher::exact_match`] before
//! [`TitleMatcher::fuzzy_match`]: an unambiguous exact title must never
//! be superseded by a noisier fuzzy result.

use std::sync::Arc;

use crate::catalog::{BookRecord, Catalog};

/// Lowercase and collapse runs of whitespace to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Title lookup over an immutable catalog snapshot.
///
/// Normalized titles are computed once at construction, in catalog
/// order, so fuzzy ranking can break score ties by insertion order.
pub struct TitleMatcher {
    catalog: Arc<Catalog>,
    normalized: Vec<String>,
}

impl TitleMatcher {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let normalized = catalog
            .records()
            .iter()
            .map(|r| normalize(&r.title))
            .collect();
        Self {
            catalog,
            normalized,
        }
    }

    /// Case-insensitive, whitespace-normalized equality against every title.
    pub fn exact_match(&self, query: &str) -> Option<&BookRecord> {
        let wanted = normalize(query);
        if wanted.is_empty() {
            return None;
        }
        self.normalized
            .iter()
            .position(|title| *title == wanted)
            .map(|i| &self.catalog.records()[i])
    }

    /// Rank titles by normalized Levenshtein similarity to `query`.
    ///
    /// Returns up to `top_k` candidates scoring at or above `threshold`,
    /// sorted descending by score. The sort is stable, so equal scores
    /// keep catalog insertion order. An empty result is a valid
    /// "no match", not an error.
    pub fn fuzzy_match(
        &self,
        query: &str,
        top_k: usize,
        threshold: f64,
    ) -> Vec<(&BookRecord, f64)> {
        let wanted = normalize(query);
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(&BookRecord, f64)> = self
            .catalog
            .records()
            .iter()
            .zip(self.normalized.iter())
            .filter_map(|(record, title)| {
                let score = strsim::normalized_levenshtein(&wanted, title);
                (score >= threshold).then_some((record, score))
            })
            .collect();

        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_catalog() -> Arc<Catalog> {
        Arc::new(Catalog::from_records(vec![
            BookRecord {
                id: 0,
                title: "Dune".to_string(),
                summary: "A desert planet...".to_string(),
                themes: vec!["politics".to_string()],
            },
            BookRecord {
                id: 1,
                title: "The Hobbit".to_string(),
                summary: "A reluctant burglar.".to_string(),
                themes: vec![],
            },
            BookRecord {
                id: 2,
                title: "1984".to_string(),
                summary: "A dystopia of total surveillance.".to_string(),
                themes: vec![],
            },
        ]))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  The   HOBBIT \t"), "the hobbit");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_exact_match_case_and_whitespace_insensitive() {
        let matcher = TitleMatcher::new(test_catalog());
        assert_eq!(matcher.exact_match("dune").unwrap().id, 0);
        assert_eq!(matcher.exact_match("  THE  hobbit ").unwrap().id, 1);
        assert!(matcher.exact_match("Duneя").is_none());
        assert!(matcher.exact_match("").is_none());
    }

    #[test]
    fn test_fuzzy_match_typo() {
        let matcher = TitleMatcher::new(test_catalog());
        let hits = matcher.fuzzy_match("Dyun", 3, 0.4);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].0.title, "Dune");
        assert!(hits[0].1 >= 0.4);
    }

    #[test]
    fn test_fuzzy_match_sorted_descending_and_thresholded() {
        let matcher = TitleMatcher::new(test_catalog());
        let hits = matcher.fuzzy_match("the hobit", 3, 0.3);
        for pair in hits.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        for (_, score) in &hits {
            assert!(*score >= 0.3);
        }
    }

    #[test]
    fn test_fuzzy_match_empty_when_nothing_clears_threshold() {
        let matcher = TitleMatcher::new(test_catalog());
        let hits = matcher.fuzzy_match("a book about sandworms", 3, 0.6);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_fuzzy_ties_keep_catalog_order() {
        let catalog = Arc::new(Catalog::from_records(vec![
            BookRecord {
                id: 0,
                title: "aab".to_string(),
                summary: "x".to_string(),
                themes: vec![],
            },
            BookRecord {
                id: 1,
                title: "aac".to_string(),
                summary: "y".to_string(),
                themes: vec![],
            },
        ]));
        let matcher = TitleMatcher::new(catalog);

        // Both are one edit away from the query, so scores tie exactly.
        let hits = matcher.fuzzy_match("aaa", 2, 0.1);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].1 - hits[1].1).abs() < 1e-9);
        assert_eq!(hits[0].0.id, 0);
        assert_eq!(hits[1].0.id, 1);
    }

    #[test]
    fn test_fuzzy_top_k_limit() {
        let matcher = TitleMatcher::new(test_catalog());
        let hits = matcher.fuzzy_match("the", 1, 0.0);
        assert_eq!(hits.len(), 1);
    }
}
