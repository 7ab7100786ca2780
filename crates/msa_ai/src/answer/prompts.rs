pub const ANSWER_INSTRUCTIONS: &str = r#"You are an agent that answers using ALL of the evidence provided.
If several sources are available, combine them into one coherent answer.
Always cite the sources at the end (file name, "sqlite:<database>", "docs:local", search provider names or URLs).
If the evidence is insufficient, say clearly what is missing.
If WEB evidence is included, integrate the SQL and DOCS evidence to enrich the answer."#;

pub fn answer_user_message(question: &str, evidence_json: &str, citations: &[String]) -> String {
    let sources = if citations.is_empty() {
        "(none)".to_string()
    } else {
        citations.join(", ")
    };
    format!(
        r#"Question: {question}

Evidence:
{evidence_json}

Available sources: {sources}

Answer:"#
    )
}
