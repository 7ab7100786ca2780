use std::time::Duration;

use msa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatModel, ModelReply};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<ModelReply>,
}

impl ChatModel for OpenAiChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::new(
                "AI_MODEL_NOT_CONFIGURED",
                "OPENAI_API_KEY is required for the openai provider",
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let req = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("AI_MODEL_FAILED", "Failed to encode chat request").with_details(e.to_string())
        })?;

        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body);

        match resp {
            Ok(r) => {
                let v: CompletionResponse = r.into_json().map_err(|e| {
                    AppError::new("AI_MODEL_FAILED", "Failed to decode chat response")
                        .with_details(e.to_string())
                })?;
                let choice = v.choices.into_iter().next().ok_or_else(|| {
                    AppError::new("AI_MODEL_FAILED", "Chat response contained no choices")
                })?;
                Ok(choice
                    .message
                    .content
                    .unwrap_or_else(|| ModelReply::Text(String::new())))
            }
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(AppError::new("AI_MODEL_FAILED", "Chat request failed")
                    .with_details(format!("status={status}; body={}", truncate(&body, 300)))
                    .with_retryable(status == 429 || status >= 500))
            }
            Err(e) => Err(AppError::new("AI_MODEL_UNREACHABLE", "Failed to call chat endpoint")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
