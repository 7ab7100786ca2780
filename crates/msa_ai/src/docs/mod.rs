use msa_core::error::AppError;
use serde::{Deserialize, Serialize};

pub mod chunking;
pub mod index;

pub use index::{DocIndex, DocIndexStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocHit {
    pub chunk_id: String,
    pub source_id: String,
    pub score: f32,
    pub snippet: String,
}

/// Semantic search over a pre-built, read-only document index.
pub trait SemanticIndex: Send + Sync {
    /// Up to `k` hits, best first. An empty index yields no hits.
    fn query(&self, text: &str, k: usize) -> Result<Vec<DocHit>, AppError>;
}
