use crate::docs::SemanticIndex;

/// Top-`k` snippets for `question`. An unbuilt index or a failed query gives an empty list.
pub fn collect_docs(index: Option<&dyn SemanticIndex>, question: &str, k: usize) -> Vec<String> {
    let Some(index) = index else {
        tracing::warn!("document index not built; no document evidence");
        return Vec::new();
    };
    match index.query(question, k) {
        Ok(hits) => {
            let snippets: Vec<String> = hits.into_iter().take(k).map(|h| h.snippet).collect();
            tracing::info!(snippets = snippets.len(), "document evidence collected");
            snippets
        }
        Err(e) => {
            tracing::warn!(error = %e, "document search failed; no document evidence");
            Vec::new()
        }
    }
}
