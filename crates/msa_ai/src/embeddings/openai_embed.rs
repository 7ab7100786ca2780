use std::time::Duration;

use msa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{bounded_input, Embedder};

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::new(
                "AI_MODEL_NOT_CONFIGURED",
                "OPENAI_API_KEY is required for openai embeddings",
            ));
        }

        let url = format!("{}/embeddings", self.base_url);
        let req = EmbeddingsRequest {
            model,
            input: bounded_input(input, 24_000),
        };
        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new("AI_EMBEDDINGS_FAILED", "Failed to encode embeddings request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) => {
                let v: EmbeddingsResponse = r.into_json().map_err(|e| {
                    AppError::new("AI_EMBEDDINGS_FAILED", "Failed to decode embeddings response")
                        .with_details(e.to_string())
                })?;
                match v.data.into_iter().next() {
                    Some(item) if !item.embedding.is_empty() => Ok(item.embedding),
                    _ => Err(AppError::new(
                        "AI_EMBEDDINGS_FAILED",
                        "Embeddings response was empty",
                    )),
                }
            }
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new("AI_EMBEDDINGS_FAILED", "Embeddings request failed")
                    .with_details(format!("status={status}"))
                    .with_retryable(status == 429 || status >= 500),
            ),
            Err(e) => Err(
                AppError::new("AI_EMBEDDINGS_FAILED", "Failed to call embeddings endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
