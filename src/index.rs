//! Embedding index: record vectors with nearest-neighbor search and
//! file persistence.
//!
//! The index is built from a catalog snapshot by embedding each
//! record's **summary** text; query time embeds the raw query with the
//! same backend. Once built (or loaded) the index is an immutable
//! snapshot; a rebuild produces a fresh value that the retriever swaps
//! in atomically.
//!
//! On disk the index is a JSON envelope. Vectors are stored as base64
//! of their little-endian f32 bytes ([`crate::embedding::vec_to_blob`]),
//! so a save/load round-trip is bit-identical. The envelope carries the
//! model name, dimensionality, and a SHA-256 fingerprint of the dataset
//! it was built from, letting `load` reject incompatible files and the
//! caller detect staleness.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::Catalog;
use crate::embedding::{self, EmbeddingBackend, EmbeddingError};

/// Current index file format version.
const FORMAT_VERSION: u32 = 1;

/// One vector in the index, keyed by the catalog record id.
#[derive(Debug, Clone)]
pub struct EmbeddingEntry {
    pub record_id: u32,
    pub vector: Vec<f32>,
}

/// A nearest-neighbor hit: cosine distance, ascending is closer.
#[derive(Debug, Clone)]
pub struct SemanticHit {
    pub record_id: u32,
    pub distance: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt index file: {0}")]
    Corrupt(String),

    #[error("index format version {found} unsupported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("index built with model '{found}', config expects '{expected}'")]
    ModelMismatch { found: String, expected: String },

    #[error("index dimensionality {found} does not match configured {expected}")]
    DimensionMismatch { found: usize, expected: usize },
}

/// Persisted JSON shape.
#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    model: String,
    dims: usize,
    dataset_sha256: String,
    created_at: i64,
    entries: Vec<IndexFileEntry>,
}

#[derive(Serialize, Deserialize)]
struct IndexFileEntry {
    record_id: u32,
    vector: String,
}

/// A searchable set of summary embeddings.
#[derive(Debug)]
pub struct EmbeddingIndex {
    model: String,
    dims: usize,
    dataset_sha256: String,
    created_at: i64,
    entries: Vec<EmbeddingEntry>,
}

impl EmbeddingIndex {
    pub fn new(
        model: impl Into<String>,
        dims: usize,
        dataset_sha256: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            dims,
            dataset_sha256: dataset_sha256.into(),
            created_at: chrono::Utc::now().timestamp(),
            entries: Vec::new(),
        }
    }

    /// Embed every catalog summary and collect the vectors.
    ///
    /// Fails fast on the first backend failure or inconsistent vector
    /// length; no partial index is returned.
    pub async fn build(
        catalog: &Catalog,
        backend: &dyn EmbeddingBackend,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let mut index = Self::new(backend.model_name(), backend.dims(), catalog.fingerprint());

        for batch in catalog.records().chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|r| r.summary.clone()).collect();
            let vectors = backend.embed(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    got: vectors.len(),
                });
            }

            for (record, vector) in batch.iter().zip(vectors) {
                index.insert(record.id, vector)?;
            }
        }

        Ok(index)
    }

    /// Insert one entry; rejects vectors that don't match the index dims.
    pub fn insert(&mut self, record_id: u32, vector: Vec<f32>) -> Result<(), EmbeddingError> {
        if vector.len() != self.dims {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dims,
                got: vector.len(),
            });
        }
        self.entries.push(EmbeddingEntry { record_id, vector });
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[EmbeddingEntry] {
        &self.entries
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Fingerprint of the dataset this index was built from.
    pub fn dataset_fingerprint(&self) -> &str {
        &self.dataset_sha256
    }

    /// True when the catalog content no longer matches the fingerprint
    /// recorded at build time.
    pub fn is_stale(&self, catalog: &Catalog) -> bool {
        self.dataset_sha256 != catalog.fingerprint()
    }

    /// Embed `query` and return the `top_k` nearest entries.
    ///
    /// An unembeddable query is an error, never an empty result.
    pub async fn search(
        &self,
        query: &str,
        backend: &dyn EmbeddingBackend,
        top_k: usize,
    ) -> Result<Vec<SemanticHit>, EmbeddingError> {
        let query_vec = embedding::embed_query(backend, query).await?;
        self.search_vector(&query_vec, top_k)
    }

    /// Nearest-neighbor search against a pre-embedded query vector.
    ///
    /// Results are sorted ascending by cosine distance; exact ties are
    /// broken by `record_id` for determinism.
    pub fn search_vector(
        &self,
        query_vec: &[f32],
        top_k: usize,
    ) -> Result<Vec<SemanticHit>, EmbeddingError> {
        if query_vec.len() != self.dims {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dims,
                got: query_vec.len(),
            });
        }

        let mut hits: Vec<SemanticHit> = self
            .entries
            .iter()
            .map(|entry| SemanticHit {
                record_id: entry.record_id,
                distance: embedding::cosine_distance(query_vec, &entry.vector) as f64,
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.record_id.cmp(&b.record_id))
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    /// Write the index atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), IndexFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = IndexFile {
            version: FORMAT_VERSION,
            model: self.model.clone(),
            dims: self.dims,
            dataset_sha256: self.dataset_sha256.clone(),
            created_at: self.created_at,
            entries: self
                .entries
                .iter()
                .map(|entry| IndexFileEntry {
                    record_id: entry.record_id,
                    vector: base64::engine::general_purpose::STANDARD
                        .encode(embedding::vec_to_blob(&entry.vector)),
                })
                .collect(),
        };

        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| IndexFileError::Corrupt(e.to_string()))?;

        let temp_path = path.with_extension("tmp");
        if let Err(e) = std::fs::write(&temp_path, &bytes) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Read an index back, validating format and compatibility.
    ///
    /// Fails on unreadable files, malformed JSON, an unsupported format
    /// version, a model or dims mismatch versus the configuration, and
    /// truncated or mis-sized vector blobs.
    pub fn load(
        path: &Path,
        expected_model: &str,
        expected_dims: usize,
    ) -> Result<Self, IndexFileError> {
        let bytes = std::fs::read(path)?;

        let file: IndexFile = serde_json::from_slice(&bytes)
            .map_err(|e| IndexFileError::Corrupt(e.to_string()))?;

        if file.version != FORMAT_VERSION {
            return Err(IndexFileError::VersionMismatch {
                found: file.version,
                expected: FORMAT_VERSION,
            });
        }
        if file.model != expected_model {
            return Err(IndexFileError::ModelMismatch {
                found: file.model,
                expected: expected_model.to_string(),
            });
        }
        if file.dims != expected_dims {
            return Err(IndexFileError::DimensionMismatch {
                found: file.dims,
                expected: expected_dims,
            });
        }

        let mut entries = Vec::with_capacity(file.entries.len());
        for entry in &file.entries {
            let blob = base64::engine::general_purpose::STANDARD
                .decode(&entry.vector)
                .map_err(|e| IndexFileError::Corrupt(format!("bad vector encoding: {}", e)))?;

            if blob.len() % 4 != 0 {
                return Err(IndexFileError::Corrupt(format!(
                    "truncated vector blob for record {}",
                    entry.record_id
                )));
            }

            let vector = embedding::blob_to_vec(&blob);
            if vector.len() != file.dims {
                return Err(IndexFileError::Corrupt(format!(
                    "record {} has {} dims, index declares {}",
                    entry.record_id,
                    vector.len(),
                    file.dims
                )));
            }

            entries.push(EmbeddingEntry {
                record_id: entry.record_id,
                vector,
            });
        }

        Ok(Self {
            model: file.model,
            dims: file.dims,
            dataset_sha256: file.dataset_sha256,
            created_at: file.created_at,
            entries,
        })
    }
}
