//! Three-tier query resolution: exact title → fuzzy title → semantic.
//!
//! Tiers 1–2 are pure in-memory string matching and never touch I/O, so
//! well-formed input resolves deterministically at zero cost. Only when
//! both come up empty does the retriever engage the embedding backend,
//! and a failure there degrades to [`RetrievalResult::Empty`] instead
//! of failing the query. The exception is [`Retriever::semantic`]: the
//! caller asked for that tier explicitly, so the error propagates.
//!
//! The index is held as an atomically swappable snapshot: a rebuild
//! constructs a fresh [`EmbeddingIndex`] and publishes it in one write,
//! so concurrent readers never observe a partially built index.

use std::sync::{Arc, RwLock};

use crate::catalog::{BookRecord, Catalog};
use crate::config::MatchingConfig;
use crate::embedding::{EmbeddingBackend, EmbeddingError};
use crate::index::EmbeddingIndex;
use crate::matcher::TitleMatcher;

/// A fuzzy candidate: similarity score in [0, 1], higher is closer.
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub record: BookRecord,
    pub score: f64,
}

/// A semantic candidate: cosine distance, lower is closer.
#[derive(Debug, Clone)]
pub struct SemanticMatch {
    pub record: BookRecord,
    pub distance: f64,
}

/// Outcome of a resolution, one variant per tier.
#[derive(Debug, Clone)]
pub enum RetrievalResult {
    Exact(BookRecord),
    Fuzzy(Vec<FuzzyMatch>),
    Semantic(Vec<SemanticMatch>),
    Empty,
}

/// Single entry point composing the title matcher and the embedding
/// index into one resolution policy.
pub struct Retriever {
    catalog: Arc<Catalog>,
    matcher: TitleMatcher,
    matching: MatchingConfig,
    backend: Option<Arc<dyn EmbeddingBackend>>,
    index: RwLock<Option<Arc<EmbeddingIndex>>>,
}

impl Retriever {
    pub fn new(
        catalog: Arc<Catalog>,
        matching: MatchingConfig,
        backend: Option<Arc<dyn EmbeddingBackend>>,
    ) -> Self {
        let matcher = TitleMatcher::new(catalog.clone());
        Self {
            catalog,
            matcher,
            matching,
            backend,
            index: RwLock::new(None),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn matcher(&self) -> &TitleMatcher {
        &self.matcher
    }

    pub fn matching(&self) -> &MatchingConfig {
        &self.matching
    }

    pub fn backend(&self) -> Option<&Arc<dyn EmbeddingBackend>> {
        self.backend.as_ref()
    }

    /// Swap in a freshly built index snapshot.
    pub fn publish_index(&self, index: Arc<EmbeddingIndex>) {
        *self.index.write().unwrap() = Some(index);
    }

    /// The currently published snapshot, if any.
    pub fn index_snapshot(&self) -> Option<Arc<EmbeddingIndex>> {
        self.index.read().unwrap().clone()
    }

    /// Resolve a query through the tiers.
    ///
    /// 1. Exact title match.
    /// 2. Fuzzy title match at the configured threshold.
    /// 3. Semantic search, when a backend is configured; failures here
    ///    are logged and swallowed.
    /// 4. [`RetrievalResult::Empty`].
    pub async fn resolve(&self, query: &str) -> RetrievalResult {
        if let Some(record) = self.matcher.exact_match(query) {
            return RetrievalResult::Exact(record.clone());
        }

        let fuzzy = self.matcher.fuzzy_match(
            query,
            self.matching.fuzzy_top_k,
            self.matching.fuzzy_threshold,
        );
        if !fuzzy.is_empty() {
            return RetrievalResult::Fuzzy(
                fuzzy
                    .into_iter()
                    .map(|(record, score)| FuzzyMatch {
                        record: record.clone(),
                        score,
                    })
                    .collect(),
            );
        }

        if self.backend.is_some() {
            match self.semantic(query).await {
                Ok(hits) if !hits.is_empty() => return RetrievalResult::Semantic(hits),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("semantic tier unavailable, degrading to no match: {}", e)
                }
            }
        }

        RetrievalResult::Empty
    }

    /// Semantic search requested explicitly; errors are fatal here.
    pub async fn semantic(&self, query: &str) -> Result<Vec<SemanticMatch>, EmbeddingError> {
        let backend = self.backend.as_ref().ok_or(EmbeddingError::Disabled)?;
        let index = self.index_snapshot().ok_or(EmbeddingError::MissingIndex)?;

        let hits = index
            .search(query, backend.as_ref(), self.matching.semantic_top_k)
            .await?;

        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.catalog.find_by_id(hit.record_id) {
                Some(record) => matches.push(SemanticMatch {
                    record: record.clone(),
                    distance: hit.distance,
                }),
                None => {
                    tracing::warn!("index references unknown record id {}", hit.record_id)
                }
            }
        }

        Ok(matches)
    }
}
