use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Citation emitted once per question whenever document collection ran.
pub const DOCS_CITATION: &str = "docs:local";

/// Citation emitted for web collection when no provider contributed text.
pub const WEB_FALLBACK_CITATION: &str = "internet";

pub fn sqlite_citation(container: &str) -> String {
    format!("sqlite:{container}")
}

/// A source category the router can select for a question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Route {
    Sql,
    Docs,
    Web,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Sql, Route::Docs, Route::Web];

    pub fn label(self) -> &'static str {
        match self {
            Route::Sql => "SQL",
            Route::Docs => "DOCS",
            Route::Web => "WEB",
        }
    }

    /// Exact (case-insensitive) label match; surrounding whitespace is ignored.
    pub fn from_label(label: &str) -> Option<Route> {
        let label = label.trim();
        Route::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Non-empty set of routes. Construction from an empty selection yields `{WEB}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "Vec<Route>", from = "Vec<Route>")]
pub struct RouteSet(BTreeSet<Route>);

impl RouteSet {
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut set: BTreeSet<Route> = routes.into_iter().collect();
        if set.is_empty() {
            set.insert(Route::Web);
        }
        Self(set)
    }

    pub fn contains(&self, route: Route) -> bool {
        self.0.contains(&route)
    }

    pub fn iter(&self) -> impl Iterator<Item = Route> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept so the type reads like a collection.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Which collectors run for this selection.
    ///
    /// Web evidence is always corroborated by internal sources, so WEB implies SQL and DOCS.
    pub fn plan(&self) -> CollectionPlan {
        let web = self.contains(Route::Web);
        CollectionPlan {
            sql: self.contains(Route::Sql) || web,
            docs: self.contains(Route::Docs) || web,
            web,
        }
    }
}

impl From<Vec<Route>> for RouteSet {
    fn from(routes: Vec<Route>) -> Self {
        RouteSet::new(routes)
    }
}

impl From<RouteSet> for Vec<Route> {
    fn from(set: RouteSet) -> Self {
        set.0.into_iter().collect()
    }
}

impl fmt::Display for RouteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.iter().map(Route::label).collect();
        write!(f, "[{}]", labels.join(","))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionPlan {
    pub sql: bool,
    pub docs: bool,
    pub web: bool,
}

/// One row of a relation, column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SqlOutcome {
    Rows(Vec<Row>),
    Error(String),
}

/// Rows (or the read failure) for one relation of one container.
///
/// `relation` is `None` when the container itself could not be opened or enumerated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SqlEvidence {
    pub container: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(flatten)]
    pub outcome: SqlOutcome,
}

impl SqlEvidence {
    pub fn rows(&self) -> &[Row] {
        match &self.outcome {
            SqlOutcome::Rows(rows) => rows,
            SqlOutcome::Error(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            SqlOutcome::Rows(_) => None,
            SqlOutcome::Error(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocsEvidence {
    pub snippets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebEvidence {
    pub text: String,
    pub sources: Vec<String>,
}

/// A retrieved, source-tagged unit of information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Evidence {
    Sql(SqlEvidence),
    Docs(DocsEvidence),
    Web(WebEvidence),
}

impl Evidence {
    pub fn route(&self) -> Route {
        match self {
            Evidence::Sql(_) => Route::Sql,
            Evidence::Docs(_) => Route::Docs,
            Evidence::Web(_) => Route::Web,
        }
    }
}

/// Per-question state threaded through the pipeline stages.
///
/// Each stage consumes the previous snapshot and returns a new one; evidence and
/// citations are only ever appended to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub question: String,
    pub routes: Option<RouteSet>,
    pub evidences: Option<Vec<Evidence>>,
    pub citations: Option<Vec<String>>,
    pub final_answer: Option<String>,
}

impl AgentState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            routes: None,
            evidences: None,
            citations: None,
            final_answer: None,
        }
    }

    pub fn with_routes(self, routes: RouteSet) -> Self {
        Self {
            routes: Some(routes),
            ..self
        }
    }

    pub fn with_evidence(self, evidences: Vec<Evidence>, citations: Vec<String>) -> Self {
        let mut all_evidences = self.evidences.unwrap_or_default();
        all_evidences.extend(evidences);
        let mut all_citations = self.citations.unwrap_or_default();
        all_citations.extend(citations);
        Self {
            evidences: Some(all_evidences),
            citations: Some(all_citations),
            ..self
        }
    }

    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        Self {
            final_answer: Some(answer.into()),
            ..self
        }
    }

    pub fn evidences(&self) -> &[Evidence] {
        self.evidences.as_deref().unwrap_or(&[])
    }

    pub fn citations(&self) -> &[String] {
        self.citations.as_deref().unwrap_or(&[])
    }
}
