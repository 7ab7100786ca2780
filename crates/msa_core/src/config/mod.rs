//! Agent configuration.
//!
//! Resolution order: built-in defaults, then an optional JSON file, then
//! environment variables. The binary applies its CLI flags last.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Openai,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embeddings_model")]
    pub embeddings_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            chat_model: default_chat_model(),
            embeddings_model: default_embeddings_model(),
            openai_base_url: default_openai_base_url(),
            openai_api_key: String::new(),
            ollama_base_url: default_ollama_base_url(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embeddings_model() -> String {
    "text-embedding-3-small".into()
}
/// Embeddings model used with the Ollama provider when none was chosen explicitly.
pub const OLLAMA_DEFAULT_EMBEDDINGS_MODEL: &str = "nomic-embed-text";

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".into()
}
fn default_model_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataConfig {
    #[serde(default = "default_sqlite_dir")]
    pub sqlite_dir: PathBuf,
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sqlite_dir: default_sqlite_dir(),
            docs_dir: default_docs_dir(),
        }
    }
}

fn default_sqlite_dir() -> PathBuf {
    PathBuf::from("data/sqlite")
}
fn default_docs_dir() -> PathBuf {
    PathBuf::from("data/documents")
}

/// How the web collector treats providers after one succeeds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebPolicy {
    /// Query every provider and concatenate all non-empty results.
    #[default]
    Aggregate,
    /// Stop at the first provider that yields text.
    FirstSuccess,
}

impl WebPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregate" | "all" => Some(Self::Aggregate),
            "first_success" | "first-success" | "first" => Some(Self::FirstSuccess),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebConfig {
    #[serde(default = "default_searx_url")]
    pub searx_url: String,
    #[serde(default = "default_duckduckgo_url")]
    pub duckduckgo_url: String,
    #[serde(default = "default_wikipedia_url")]
    pub wikipedia_url: String,
    #[serde(default)]
    pub policy: WebPolicy,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default = "default_web_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            searx_url: default_searx_url(),
            duckduckgo_url: default_duckduckgo_url(),
            wikipedia_url: default_wikipedia_url(),
            policy: WebPolicy::default(),
            auto_approve: false,
            timeout_secs: default_web_timeout_secs(),
        }
    }
}

fn default_searx_url() -> String {
    "https://searx.perennialte.ch/search".into()
}
fn default_duckduckgo_url() -> String {
    "https://api.duckduckgo.com/".into()
}
fn default_wikipedia_url() -> String {
    "https://pt.wikipedia.org/api/rest_v1/page/summary/".into()
}
fn default_web_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    /// SQL, then DOCS, then WEB, one after another.
    #[default]
    Sequential,
    /// SQL and DOCS side by side; WEB still runs after both.
    Concurrent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub collection: CollectionMode,
    #[serde(default = "default_docs_top_k")]
    pub docs_top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection: CollectionMode::default(),
            docs_top_k: default_docs_top_k(),
        }
    }
}

fn default_docs_top_k() -> usize {
    3
}

impl AgentConfig {
    /// Defaults, overlaid with `path` when given, overlaid with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.apply_provider_defaults();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to parse config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    /// Overlay values from an environment lookup. Unknown or empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.model.openai_api_key = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.model.openai_base_url = v;
        }
        if let Some(v) = get("MODEL_NAME") {
            self.model.chat_model = v;
        }
        if let Some(v) = get("EMBEDDINGS_MODEL") {
            self.model.embeddings_model = v;
        }
        if let Some(v) = get("OLLAMA_BASE_URL") {
            self.model.ollama_base_url = v;
        }
        match get("MSA_LLM_PROVIDER").map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("openai") => self.model.provider = LlmProvider::Openai,
            Some("ollama") => self.model.provider = LlmProvider::Ollama,
            Some(other) => tracing::warn!(value = other, "ignoring unknown MSA_LLM_PROVIDER"),
            None => {}
        }
        if let Some(v) = get("MSA_SQLITE_DIR") {
            self.data.sqlite_dir = PathBuf::from(v);
        }
        if let Some(v) = get("MSA_DOCS_DIR") {
            self.data.docs_dir = PathBuf::from(v);
        }
        if let Some(v) = get("MSA_AUTO_APPROVE") {
            self.web.auto_approve = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = get("MSA_WEB_POLICY") {
            match WebPolicy::parse(&v) {
                Some(policy) => self.web.policy = policy,
                None => tracing::warn!(value = %v, "ignoring unknown MSA_WEB_POLICY"),
            }
        }
    }

    /// Swap the OpenAI embeddings default for an Ollama one when Ollama is selected.
    pub fn apply_provider_defaults(&mut self) {
        if self.model.provider == LlmProvider::Ollama && self.model.embeddings_model == default_embeddings_model() {
            tracing::info!(
                model = OLLAMA_DEFAULT_EMBEDDINGS_MODEL,
                "using the ollama embeddings default"
            );
            self.model.embeddings_model = OLLAMA_DEFAULT_EMBEDDINGS_MODEL.to_string();
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.pipeline.docs_top_k == 0 {
            return Err(AppError::new("CONFIG_INVALID", "pipeline.docs_top_k must be at least 1"));
        }
        if self.model.provider == LlmProvider::Openai && self.model.openai_api_key.trim().is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; model calls will fail");
        }
        if self.model.provider == LlmProvider::Ollama && self.model.embeddings_model.starts_with("text-embedding-") {
            tracing::warn!(
                model = %self.model.embeddings_model,
                "embeddings model looks like an OpenAI model; ollama will not serve it"
            );
        }
        Ok(())
    }
}
