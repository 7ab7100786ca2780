#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use msa_ai::docs::{DocHit, SemanticIndex};
use msa_ai::embeddings::Embedder;
use msa_ai::llm::{ChatMessage, ChatModel, ModelReply};
use msa_ai::web::approval::{ApprovalGate, Prompter};
use msa_ai::web::fetch::{FetchResponse, HttpFetcher, OutboundRequest};
use msa_ai::web::WebCollector;
use msa_core::config::{WebConfig, WebPolicy};
use msa_core::db::StructuredSource;
use msa_core::domain::Row;
use msa_core::error::AppError;

/// Replies in order; records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply, AppError>>>,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<ModelReply, AppError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(ModelReply::from(*r))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ChatModel for ScriptedModel {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, AppError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::new("AI_MODEL_FAILED", "script exhausted")))
    }
}

/// In-memory containers; relations listed here but missing from `rows` fail to read.
#[derive(Default)]
pub struct FakeSource {
    pub containers: Vec<String>,
    pub relations: BTreeMap<String, Result<Vec<String>, String>>,
    pub rows: BTreeMap<(String, String), Vec<Row>>,
    pub reads: AtomicUsize,
}

impl FakeSource {
    pub fn with_table(mut self, container: &str, relation: &str, n: usize) -> Self {
        if !self.containers.iter().any(|c| c == container) {
            self.containers.push(container.to_string());
        }
        let entry = self
            .relations
            .entry(container.to_string())
            .or_insert_with(|| Ok(Vec::new()));
        if let Ok(list) = entry {
            list.push(relation.to_string());
        }
        let rows = (0..n)
            .map(|i| {
                let mut r = Row::new();
                r.insert("id".to_string(), serde_json::json!(i));
                r
            })
            .collect();
        self.rows.insert((container.to_string(), relation.to_string()), rows);
        self
    }

    pub fn with_broken_relation(mut self, container: &str, relation: &str) -> Self {
        if !self.containers.iter().any(|c| c == container) {
            self.containers.push(container.to_string());
        }
        if let Ok(list) = self
            .relations
            .entry(container.to_string())
            .or_insert_with(|| Ok(Vec::new()))
        {
            list.push(relation.to_string());
        }
        self
    }

    pub fn with_broken_container(mut self, container: &str) -> Self {
        self.containers.push(container.to_string());
        self.relations
            .insert(container.to_string(), Err("file is not a database".to_string()));
        self
    }
}

impl StructuredSource for FakeSource {
    fn list_containers(&self) -> Result<Vec<String>, AppError> {
        Ok(self.containers.clone())
    }

    fn list_relations(&self, container: &str) -> Result<Vec<String>, AppError> {
        match self.relations.get(container) {
            Some(Ok(list)) => Ok(list.clone()),
            Some(Err(e)) => Err(AppError::new("DB_OPEN_FAILED", e.clone())),
            None => Ok(Vec::new()),
        }
    }

    fn read_rows(&self, container: &str, relation: &str, _limit: usize) -> Result<Vec<Row>, AppError> {
        // Deliberately ignores the limit so the collector's own cap is exercised.
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.rows
            .get(&(container.to_string(), relation.to_string()))
            .cloned()
            .ok_or_else(|| AppError::new("DB_READ_FAILED", format!("no such table: {relation}")))
    }
}

pub struct FixedIndex {
    pub hits: Result<Vec<DocHit>, AppError>,
}

impl FixedIndex {
    pub fn snippets(snippets: &[&str]) -> Self {
        Self {
            hits: Ok(snippets
                .iter()
                .enumerate()
                .map(|(i, s)| DocHit {
                    chunk_id: format!("c{i}"),
                    source_id: "doc.txt".to_string(),
                    score: 1.0 - i as f32 * 0.1,
                    snippet: s.to_string(),
                })
                .collect()),
        }
    }
}

impl SemanticIndex for FixedIndex {
    fn query(&self, _text: &str, _k: usize) -> Result<Vec<DocHit>, AppError> {
        self.hits.clone()
    }
}

/// Counts 'a' and 'b' characters; deterministic two-dimensional embedding.
pub struct CountABEmbedder;

impl Embedder for CountABEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let a = input.chars().filter(|c| *c == 'a').count() as f32;
        let b = input.chars().filter(|c| *c == 'b').count() as f32;
        Ok(vec![a, b])
    }
}

/// Scripted operator answers; counts prompts.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Result<bool, AppError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().map(|a| Ok(*a)).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(VecDeque::from([Err(AppError::new(
                "APPROVAL_PROMPT_FAILED",
                "stdin closed",
            ))])),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, command: &str) -> Result<bool, AppError> {
        self.prompts.lock().unwrap().push(command.to_string());
        self.answers.lock().unwrap().pop_front().unwrap_or(Ok(false))
    }
}

/// Responds by URL substring; records every executed request.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub routes: Vec<(String, Result<FetchResponse, AppError>)>,
    pub executed: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn respond(mut self, url_contains: &str, status: u16, body: &str) -> Self {
        self.routes.push((
            url_contains.to_string(),
            Ok(FetchResponse {
                status,
                body: body.to_string(),
            }),
        ));
        self
    }

    pub fn fail(mut self, url_contains: &str) -> Self {
        self.routes.push((
            url_contains.to_string(),
            Err(AppError::new("WEB_FETCH_FAILED", "connection refused")),
        ));
        self
    }

    pub fn executed_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

impl HttpFetcher for ScriptedFetcher {
    fn fetch(&self, req: &OutboundRequest) -> Result<FetchResponse, AppError> {
        self.executed.lock().unwrap().push(req.url.clone());
        self.routes
            .iter()
            .find(|(needle, _)| req.url.contains(needle.as_str()))
            .map(|(_, r)| r.clone())
            .unwrap_or(Ok(FetchResponse {
                status: 404,
                body: String::new(),
            }))
    }
}

pub const SEARX_OK: &str = r#"{"results": [{"content": "Paris is the capital of France."}]}"#;
pub const DDG_OK: &str = r#"{"AbstractText": "France is a country in Western Europe.", "RelatedTopics": []}"#;
pub const WIKI_OK: &str = r#"{"title": "França", "extract": "A França é um país europeu."}"#;

pub fn all_providers_ok() -> ScriptedFetcher {
    ScriptedFetcher::default()
        .respond("searx", 200, SEARX_OK)
        .respond("duckduckgo", 200, DDG_OK)
        .respond("wikipedia", 200, WIKI_OK)
}

pub fn web_collector(gate: Arc<ApprovalGate>, fetcher: Arc<ScriptedFetcher>, policy: WebPolicy) -> WebCollector {
    let config = WebConfig {
        policy,
        ..WebConfig::default()
    };
    WebCollector::new(config, gate, fetcher)
}
