use std::sync::Arc;
use std::time::Instant;

use msa_core::config::{WebConfig, WebPolicy};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub mod approval;
pub mod fetch;
pub mod keywords;
pub mod providers;

use approval::ApprovalGate;
use fetch::HttpFetcher;
use keywords::{HeuristicKeywords, KeywordExtractor};
use providers::Provider;

/// Web text when no provider produced anything usable.
pub const NO_WEB_RESULTS: &str = "no relevant information found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebSearchResult {
    pub text: String,
    /// Display names of the providers that contributed text, in provider order.
    pub sources: Vec<String>,
}

/// Diagnostic view of one web search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchReport {
    pub query: String,
    pub keywords: Vec<String>,
    pub success: bool,
    pub text: String,
    pub sources: Vec<String>,
    pub started_at: String,
    pub elapsed_ms: u64,
}

pub struct WebCollector {
    config: WebConfig,
    gate: Arc<ApprovalGate>,
    fetcher: Arc<dyn HttpFetcher>,
    keywords: Arc<dyn KeywordExtractor>,
}

impl WebCollector {
    pub fn new(config: WebConfig, gate: Arc<ApprovalGate>, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            config,
            gate,
            fetcher,
            keywords: Arc::new(HeuristicKeywords),
        }
    }

    pub fn with_keyword_extractor(mut self, keywords: Arc<dyn KeywordExtractor>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    /// Consult the providers in fixed order and merge whatever they return.
    ///
    /// Provider failures, rejected approvals and unusable payloads only drop that
    /// provider; this never fails.
    pub fn search(&self, question: &str) -> WebSearchResult {
        let keywords = self.keywords.extract(question);
        self.search_with_keywords(question, &keywords)
    }

    pub fn search_detailed(&self, question: &str) -> WebSearchReport {
        let started_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        let clock = Instant::now();
        let keywords = self.keywords.extract(question);
        let result = self.search_with_keywords(question, &keywords);
        WebSearchReport {
            query: question.to_string(),
            success: !result.sources.is_empty(),
            keywords,
            text: result.text,
            sources: result.sources,
            started_at,
            elapsed_ms: clock.elapsed().as_millis().min(u64::MAX as u128) as u64,
        }
    }

    fn search_with_keywords(&self, question: &str, keywords: &[String]) -> WebSearchResult {
        let mut texts: Vec<String> = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        for provider in Provider::ORDER {
            let Some(text) = self.query_provider(provider, question, keywords) else {
                continue;
            };
            texts.push(text);
            sources.push(provider.display_name().to_string());
            if self.config.policy == WebPolicy::FirstSuccess {
                break;
            }
        }

        if texts.is_empty() {
            tracing::info!("no web provider returned usable text");
            return WebSearchResult {
                text: NO_WEB_RESULTS.to_string(),
                sources: Vec::new(),
            };
        }
        WebSearchResult {
            text: texts.join("\n\n"),
            sources,
        }
    }

    fn query_provider(&self, provider: Provider, question: &str, keywords: &[String]) -> Option<String> {
        let name = provider.display_name();
        let req = match provider.build_request(&self.config, question, keywords) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(provider = name, error = %e, "could not build provider request");
                return None;
            }
        };

        if !self.gate.request(&req.command_text()).is_approved() {
            tracing::debug!(provider = name, "provider skipped: not approved");
            return None;
        }

        let resp = match self.fetcher.fetch(&req) {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(provider = name, error = %e, "provider request failed");
                return None;
            }
        };
        if !resp.is_success() {
            tracing::warn!(provider = name, status = resp.status, "provider returned non-success status");
            return None;
        }
        let body: serde_json::Value = match serde_json::from_str(&resp.body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(provider = name, error = %e, "provider response is not JSON");
                return None;
            }
        };

        let text = provider.extract(&body);
        match &text {
            Some(t) => tracing::info!(provider = name, chars = t.len(), "provider returned text"),
            None => tracing::debug!(provider = name, "provider response had no usable field"),
        }
        text
    }
}
