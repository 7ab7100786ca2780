use msa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatModel, ModelReply};
use crate::ollama::OllamaClient;

/// Chat completions from a local Ollama model via `/api/chat`, non-streaming.
#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: OllamaClient,
    model: String,
}

impl OllamaChat {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: ModelReply,
}

impl ChatModel for OllamaChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, AppError> {
        let req = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        let resp: ChatResponse = self.client.post_json("/api/chat", &req, "AI_MODEL_FAILED")?;
        tracing::debug!(model = %self.model, "ollama chat completed");
        Ok(resp.message.content)
    }
}
