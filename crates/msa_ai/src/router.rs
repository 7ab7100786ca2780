use msa_core::domain::{Route, RouteSet};
use msa_core::error::AppError;

use crate::llm::{ChatMessage, ChatModel};

pub const ROUTER_INSTRUCTIONS: &str = r#"You route questions to evidence sources.
Available sources:
- SQL: structured data, metrics, records (SQLite databases).
- DOCS: reports, manuals, internal documents (.txt files).
- WEB: news and up-to-date external information from internet search engines.

Routing rules:
1. You may choose ONE or MORE sources.
2. Whenever you choose WEB, also combine it with SQL and/or DOCS for more complete answers.
3. Prefer SQL when the question involves structured data or metrics.
4. Prefer DOCS when the question involves internal information or documents.
5. Prefer WEB when recent or external information is needed.

Return only a JSON list with the chosen sources, e.g. ["SQL"], ["DOCS","SQL"], ["WEB","DOCS"]."#;

/// Classify `question` with exactly one model call. Never returns an empty set.
pub fn route_question(model: &dyn ChatModel, question: &str) -> Result<RouteSet, AppError> {
    let reply = model.complete(&[
        ChatMessage::system(ROUTER_INSTRUCTIONS),
        ChatMessage::user(question),
    ])?;
    let raw = reply.into_text();
    let routes = parse_routes(raw.trim());
    tracing::info!(routes = %routes, "question routed");
    Ok(routes)
}

/// JSON array of labels first; otherwise any label mentioned anywhere in the text.
pub fn parse_routes(raw: &str) -> RouteSet {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(labels) => RouteSet::new(labels.iter().filter_map(|l| Route::from_label(l))),
        Err(_) => {
            tracing::debug!(raw, "router reply is not a JSON label list; scanning text");
            let upper = raw.to_ascii_uppercase();
            RouteSet::new(Route::ALL.into_iter().filter(|r| upper.contains(r.label())))
        }
    }
}
