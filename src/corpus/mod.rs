//! Knowledge corpus: precomputed text chunks and their embeddings.
//!
//! The corpus is built offline by `uzhavan index`, written as a single JSON
//! file, and loaded once at start-up. It is read-only afterwards.

mod chunker;

pub use chunker::TextChunker;

use crate::error::{Result, UzhavanError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// An immutable piece of the knowledge corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    id: String,
    text: String,
    embedding: Vec<f32>,
    norm: f32,
}

impl Chunk {
    /// Create a chunk. The embedding must be finite and non-zero, and its
    /// norm must fit in an `f32`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Result<Self> {
        let id = id.into();

        if embedding.is_empty() {
            return Err(UzhavanError::Corpus(format!("Chunk {} has an empty embedding", id)));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(UzhavanError::Corpus(format!(
                "Chunk {} has a non-finite embedding value",
                id
            )));
        }

        let norm = crate::retrieval::l2_norm(&embedding);
        if norm == 0.0 {
            return Err(UzhavanError::Corpus(format!("Chunk {} has a zero embedding", id)));
        }
        if !norm.is_finite() {
            return Err(UzhavanError::Corpus(format!(
                "Chunk {} has an embedding norm that overflows",
                id
            )));
        }

        Ok(Self {
            id,
            text: text.into(),
            embedding,
            norm,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Euclidean norm of the embedding, computed once at construction.
    pub fn norm(&self) -> f32 {
        self.norm
    }
}

/// Identifier and text of a chunk as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
}

/// On-disk layout: the embedding list and the chunk list, index-aligned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    /// Embedding model that produced the vectors.
    #[serde(default)]
    pub model: Option<String>,
    /// When the corpus was built.
    #[serde(default)]
    pub built_at: Option<DateTime<Utc>>,
    /// Length of every embedding. Absent in files written without a header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    pub embeddings: Vec<Vec<f32>>,
    pub chunks: Vec<ChunkRecord>,
}

/// Ordered, read-only collection of chunks sharing one dimensionality.
#[derive(Debug, Clone, Default)]
pub struct CorpusStore {
    chunks: Vec<Chunk>,
    model: Option<String>,
    built_at: Option<DateTime<Utc>>,
}

impl CorpusStore {
    /// Build a store from chunks, checking that all embeddings agree in length.
    pub fn new(chunks: Vec<Chunk>) -> Result<Self> {
        if let Some(first) = chunks.first() {
            let expected = first.embedding().len();
            if let Some(bad) = chunks.iter().find(|c| c.embedding().len() != expected) {
                return Err(UzhavanError::DimensionMismatch {
                    expected,
                    actual: bad.embedding().len(),
                });
            }
        }

        Ok(Self {
            chunks,
            model: None,
            built_at: None,
        })
    }

    /// Record which embedding model produced this corpus.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self.built_at = Some(Utc::now());
        self
    }

    /// Load a corpus file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UzhavanError::Corpus(format!(
                "Corpus file not found: {}. Build one with: uzhavan index <files>",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let file: CorpusFile = serde_json::from_str(&content)?;
        let store = Self::from_file(file)?;

        if store.is_empty() {
            warn!("Corpus {} contains no chunks", path.display());
        } else {
            info!(
                "Loaded {} chunks ({} dimensions) from {}",
                store.len(),
                store.dimensions().unwrap_or(0),
                path.display()
            );
        }

        Ok(store)
    }

    /// Convert the persisted form into a validated store.
    pub fn from_file(file: CorpusFile) -> Result<Self> {
        if file.embeddings.len() != file.chunks.len() {
            return Err(UzhavanError::Corpus(format!(
                "Corpus has {} embeddings but {} chunks",
                file.embeddings.len(),
                file.chunks.len()
            )));
        }

        let chunks = file
            .chunks
            .into_iter()
            .zip(file.embeddings)
            .map(|(record, embedding)| Chunk::new(record.id, record.text, embedding))
            .collect::<Result<Vec<_>>>()?;

        let mut store = Self::new(chunks)?;
        if let (Some(expected), Some(actual)) = (file.dimensions, store.dimensions()) {
            if expected != actual {
                return Err(UzhavanError::DimensionMismatch { expected, actual });
            }
        }
        store.model = file.model;
        store.built_at = file.built_at;
        Ok(store)
    }

    /// Convert into the persisted form.
    pub fn to_file(&self) -> CorpusFile {
        CorpusFile {
            model: self.model.clone(),
            built_at: self.built_at,
            dimensions: self.dimensions(),
            embeddings: self.chunks.iter().map(|c| c.embedding.clone()).collect(),
            chunks: self
                .chunks
                .iter()
                .map(|c| ChunkRecord {
                    id: c.id.clone(),
                    text: c.text.clone(),
                })
                .collect(),
        }
    }

    /// Write the corpus file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&self.to_file())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality, or `None` for an empty corpus.
    pub fn dimensions(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.embedding().len())
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    /// Fail unless the corpus vectors match the embedder's output size.
    pub fn ensure_dimensions(&self, expected: usize) -> Result<()> {
        match self.dimensions() {
            Some(actual) if actual != expected => {
                Err(UzhavanError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}
