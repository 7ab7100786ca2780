use std::sync::Arc;

use msa_core::config::CollectionMode;
use msa_core::db::StructuredSource;
use msa_core::domain::{
    DocsEvidence, Evidence, RouteSet, WebEvidence, DOCS_CITATION, WEB_FALLBACK_CITATION,
};

use crate::docs::SemanticIndex;
use crate::web::WebCollector;

pub mod docs;
pub mod sql;

pub use docs::collect_docs;
pub use sql::{collect_sql, ROW_CAP};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedEvidence {
    pub evidences: Vec<Evidence>,
    pub citations: Vec<String>,
}

/// Runs the SQL, document and web collectors a route set calls for, in that order.
pub struct EvidenceCollector {
    sql: Arc<dyn StructuredSource>,
    docs: Option<Arc<dyn SemanticIndex>>,
    web: WebCollector,
    mode: CollectionMode,
    docs_top_k: usize,
}

impl EvidenceCollector {
    pub fn new(sql: Arc<dyn StructuredSource>, web: WebCollector) -> Self {
        Self {
            sql,
            docs: None,
            web,
            mode: CollectionMode::Sequential,
            docs_top_k: 3,
        }
    }

    pub fn with_docs_index(mut self, index: Arc<dyn SemanticIndex>) -> Self {
        self.docs = Some(index);
        self
    }

    pub fn with_mode(mut self, mode: CollectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_docs_top_k(mut self, k: usize) -> Self {
        self.docs_top_k = k.max(1);
        self
    }

    pub fn web(&self) -> &WebCollector {
        &self.web
    }

    pub fn collect(&self, question: &str, routes: &RouteSet) -> CollectedEvidence {
        let plan = routes.plan();
        tracing::debug!(sql = plan.sql, docs = plan.docs, web = plan.web, mode = ?self.mode, "collection plan");

        let (sql, snippets) = match self.mode {
            CollectionMode::Sequential => {
                let sql = plan.sql.then(|| collect_sql(self.sql.as_ref()));
                let snippets = plan.docs.then(|| self.docs_snippets(question));
                (sql, snippets)
            }
            CollectionMode::Concurrent => std::thread::scope(|s| {
                let sql_handle = plan.sql.then(|| s.spawn(|| collect_sql(self.sql.as_ref())));
                let snippets = plan.docs.then(|| self.docs_snippets(question));
                let sql = sql_handle.map(|h| {
                    h.join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                });
                (sql, snippets)
            }),
        };

        let mut out = CollectedEvidence::default();
        if let Some((evidences, citations)) = sql {
            out.evidences.extend(evidences);
            out.citations.extend(citations);
        }
        if let Some(snippets) = snippets {
            out.evidences.push(Evidence::Docs(DocsEvidence { snippets }));
            out.citations.push(DOCS_CITATION.to_string());
        }
        if plan.web {
            let web = self.web.search(question);
            if web.sources.is_empty() {
                out.citations.push(WEB_FALLBACK_CITATION.to_string());
            } else {
                out.citations.extend(web.sources.iter().cloned());
            }
            out.evidences.push(Evidence::Web(WebEvidence {
                text: web.text,
                sources: web.sources,
            }));
        }
        out
    }

    fn docs_snippets(&self, question: &str) -> Vec<String> {
        collect_docs(self.docs.as_deref(), question, self.docs_top_k)
    }
}
