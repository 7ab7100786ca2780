use msa_core::error::AppError;
use serde::{Deserialize, Serialize};

pub mod ollama_chat;
pub mod openai_chat;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// One element of a fragmented model response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ContentFragment {
    Part { text: String },
    Raw(serde_json::Value),
}

impl ContentFragment {
    fn push_text(&self, out: &mut String) {
        match self {
            ContentFragment::Part { text } => out.push_str(text),
            ContentFragment::Raw(serde_json::Value::String(s)) => out.push_str(s),
            ContentFragment::Raw(serde_json::Value::Null) => {}
            ContentFragment::Raw(other) => out.push_str(&other.to_string()),
        }
    }
}

/// Model output: either one text block or an ordered sequence of fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelReply {
    Text(String),
    Fragments(Vec<ContentFragment>),
}

impl ModelReply {
    /// The single place where both response shapes become one string.
    pub fn into_text(self) -> String {
        match self {
            ModelReply::Text(s) => s,
            ModelReply::Fragments(parts) => {
                let mut out = String::new();
                for p in parts.iter() {
                    p.push_text(&mut out);
                }
                out
            }
        }
    }
}

impl From<&str> for ModelReply {
    fn from(s: &str) -> Self {
        ModelReply::Text(s.to_string())
    }
}

/// Language-model capability: role-tagged messages in, one reply out. No streaming.
pub trait ChatModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, AppError>;
}
