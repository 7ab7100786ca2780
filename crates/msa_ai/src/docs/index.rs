use std::fs;
use std::path::Path;
use std::sync::Arc;

use msa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::chunking::chunk_by_paragraphs;
use super::{DocHit, SemanticIndex};
use crate::embeddings::Embedder;

pub const CHUNK_MAX_CHARS: usize = 800;
pub const CHUNK_OVERLAP_CHARS: usize = 150;
pub const SNIPPET_MAX_CHARS: usize = 400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocIndexStatus {
    pub ready: bool,
    pub model: String,
    pub dims: Option<u32>,
    pub document_count: u32,
    pub chunk_count: u32,
}

#[derive(Debug, Clone)]
struct IndexedChunk {
    chunk_id: String,
    source_id: String,
    text: String,
    vector: Vec<f32>,
    norm: f32,
}

/// In-memory vector index over the `*.txt` files of one directory.
///
/// Built once; queries never mutate it.
pub struct DocIndex {
    embedder: Arc<dyn Embedder>,
    model: String,
    dims: Option<u32>,
    document_count: u32,
    chunks: Vec<IndexedChunk>,
}

impl DocIndex {
    /// An index with nothing in it. Queries return no hits.
    pub fn empty(embedder: Arc<dyn Embedder>, model: &str) -> Self {
        Self {
            embedder,
            model: model.to_string(),
            dims: None,
            document_count: 0,
            chunks: Vec::new(),
        }
    }

    /// Chunk and embed every `*.txt` file in `dir` (file name order).
    ///
    /// A missing directory or a directory without text files is not an error: the
    /// result is an empty index and a warning.
    pub fn build_from_dir(dir: &Path, embedder: Arc<dyn Embedder>, model: &str) -> Result<Self, AppError> {
        let mut index = Self::empty(embedder, model);
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "documents directory does not exist; index left empty");
            return Ok(index);
        }

        let entries = fs::read_dir(dir).map_err(|e| {
            AppError::new("AI_INDEX_BUILD_FAILED", "Failed to list documents directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?;
        let mut files: Vec<_> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("txt"))
            .collect();
        files.sort();

        if files.is_empty() {
            tracing::warn!(dir = %dir.display(), "no .txt files found; index left empty");
            return Ok(index);
        }

        for path in files.iter() {
            let source_id = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let text = fs::read_to_string(path).map_err(|e| {
                AppError::new("AI_INDEX_BUILD_FAILED", "Failed to read document")
                    .with_details(format!("path={}; err={}", path.display(), e))
            })?;
            index.add_document(&source_id, &text)?;
        }

        tracing::info!(
            documents = index.document_count,
            chunks = index.chunks.len(),
            "document index built"
        );
        Ok(index)
    }

    /// Chunk and embed one document into the index.
    pub fn add_document(&mut self, source_id: &str, text: &str) -> Result<(), AppError> {
        for draft in chunk_by_paragraphs(source_id, text, CHUNK_MAX_CHARS, CHUNK_OVERLAP_CHARS) {
            let vector = self.embedder.embed(&self.model, &draft.text).map_err(|e| {
                AppError::new("AI_EMBEDDINGS_FAILED", "Failed to compute embeddings")
                    .with_details(format!("chunk_id={}; err={}", draft.chunk_id, e))
                    .with_retryable(e.retryable)
            })?;
            let this_dims = vector.len() as u32;
            match self.dims {
                Some(d) if d != this_dims => {
                    return Err(AppError::new(
                        "AI_INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!(
                        "expected={d}; got={this_dims}; chunk_id={}",
                        draft.chunk_id
                    )));
                }
                Some(_) => {}
                None => self.dims = Some(this_dims),
            }
            let norm = l2_norm(&vector);
            self.chunks.push(IndexedChunk {
                chunk_id: draft.chunk_id,
                source_id: source_id.to_string(),
                text: draft.text,
                vector,
                norm,
            });
        }
        self.document_count += 1;
        Ok(())
    }

    pub fn status(&self) -> DocIndexStatus {
        DocIndexStatus {
            ready: !self.chunks.is_empty(),
            model: self.model.clone(),
            dims: self.dims,
            document_count: self.document_count,
            chunk_count: self.chunks.len() as u32,
        }
    }
}

impl SemanticIndex for DocIndex {
    fn query(&self, text: &str, k: usize) -> Result<Vec<DocHit>, AppError> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let q = text.trim();
        if q.is_empty() {
            return Err(AppError::new("AI_RETRIEVAL_FAILED", "Query must not be empty"));
        }

        let qv = self.embedder.embed(&self.model, q)?;
        if Some(qv.len() as u32) != self.dims {
            return Err(AppError::new(
                "AI_RETRIEVAL_FAILED",
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={:?}; query_dims={}", self.dims, qv.len())));
        }
        let qnorm = l2_norm(&qv);
        if qnorm == 0.0 {
            return Err(AppError::new("AI_RETRIEVAL_FAILED", "Query embedding norm is zero"));
        }

        let mut scored: Vec<(&IndexedChunk, f32)> = self
            .chunks
            .iter()
            .filter(|c| c.norm > 0.0)
            .map(|c| (c, dot(&qv, &c.vector) / (qnorm * c.norm)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.chunk_id.cmp(&b.0.chunk_id))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(c, score)| DocHit {
                chunk_id: c.chunk_id.clone(),
                source_id: c.source_id.clone(),
                score,
                snippet: snippet(&c.text, SNIPPET_MAX_CHARS),
            })
            .collect())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

fn snippet(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}
