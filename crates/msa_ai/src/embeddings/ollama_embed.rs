use msa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{bounded_input, Embedder};
use crate::ollama::OllamaClient;

const MAX_PROMPT_BYTES: usize = 12_000;

/// Vectors from the local Ollama `/api/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let req = EmbedRequest {
            model,
            prompt: bounded_input(input, MAX_PROMPT_BYTES),
        };
        let resp: EmbedResponse = self
            .client
            .post_json("/api/embeddings", &req, "AI_EMBEDDINGS_FAILED")?;
        if resp.embedding.is_empty() {
            return Err(AppError::new("AI_EMBEDDINGS_FAILED", "Embeddings response was empty")
                .with_details(format!("model={model}")));
        }
        Ok(resp.embedding)
    }
}
