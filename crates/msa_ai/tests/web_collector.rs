mod common;

use std::sync::Arc;

use msa_ai::web::approval::ApprovalGate;
use msa_ai::web::keywords::KeywordExtractor;
use msa_ai::web::NO_WEB_RESULTS;
use msa_core::config::WebPolicy;
use pretty_assertions::assert_eq;

use common::{all_providers_ok, web_collector, ScriptedFetcher, ScriptedPrompter, DDG_OK, SEARX_OK, WIKI_OK};

const QUESTION: &str = "Qual a capital da França?";

#[test]
fn aggregates_every_provider_in_order() {
    let fetcher = Arc::new(all_providers_ok());
    let web = web_collector(Arc::new(ApprovalGate::auto_approve()), fetcher.clone(), WebPolicy::Aggregate);

    let res = web.search(QUESTION);
    assert_eq!(res.sources, vec!["SearX", "DuckDuckGo", "Wikipedia"]);
    assert_eq!(
        res.text,
        "Paris is the capital of France.\n\nFrance is a country in Western Europe.\n\nA França é um país europeu."
    );
    assert_eq!(fetcher.executed_count(), 3);
}

#[test]
fn all_empty_or_invalid_yields_sentinel() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("searx", 200, r#"{"results": []}"#)
            .respond("duckduckgo", 200, "<html>not json</html>")
            .respond("wikipedia", 404, r#"{"extract": "ignored on 404"}"#),
    );
    let web = web_collector(Arc::new(ApprovalGate::auto_approve()), fetcher, WebPolicy::Aggregate);

    let res = web.search(QUESTION);
    assert_eq!(res.text, NO_WEB_RESULTS);
    assert!(res.sources.is_empty());
}

#[test]
fn single_valid_provider_is_reported() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .fail("searx")
            .respond("duckduckgo", 200, r#"{"AbstractText": ""}"#)
            .respond("wikipedia", 200, WIKI_OK),
    );
    let web = web_collector(Arc::new(ApprovalGate::auto_approve()), fetcher, WebPolicy::Aggregate);

    let res = web.search(QUESTION);
    assert_eq!(res.sources, vec!["Wikipedia"]);
    assert!(res.text.contains("A França é um país europeu."));
}

#[test]
fn rejected_approval_skips_every_provider() {
    let prompter = ScriptedPrompter::answering(&[false, false, false]);
    let fetcher = Arc::new(all_providers_ok());
    let gate = Arc::new(ApprovalGate::interactive(prompter.clone()));
    let web = web_collector(gate, fetcher.clone(), WebPolicy::Aggregate);

    let res = web.search(QUESTION);
    assert_eq!(res.text, NO_WEB_RESULTS);
    assert!(res.sources.is_empty());
    assert_eq!(fetcher.executed_count(), 0);
    assert_eq!(prompter.prompt_count(), 3);
}

#[test]
fn one_approval_covers_all_providers() {
    let prompter = ScriptedPrompter::answering(&[true]);
    let fetcher = Arc::new(all_providers_ok());
    let gate = Arc::new(ApprovalGate::interactive(prompter.clone()));
    let web = web_collector(gate, fetcher.clone(), WebPolicy::Aggregate);

    let res = web.search(QUESTION);
    assert_eq!(res.sources.len(), 3);
    assert_eq!(prompter.prompt_count(), 1);
    let shown = prompter.prompts.lock().unwrap()[0].clone();
    assert!(shown.starts_with("GET https://searx.perennialte.ch/search?q="));
}

#[test]
fn rejecting_first_prompt_then_approving_second_runs_remaining_providers() {
    let prompter = ScriptedPrompter::answering(&[false, true]);
    let fetcher = Arc::new(all_providers_ok());
    let gate = Arc::new(ApprovalGate::interactive(prompter.clone()));
    let web = web_collector(gate, fetcher.clone(), WebPolicy::Aggregate);

    let res = web.search(QUESTION);
    assert_eq!(res.sources, vec!["DuckDuckGo", "Wikipedia"]);
    assert_eq!(fetcher.executed_count(), 2);
}

#[test]
fn first_success_policy_short_circuits() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("searx", 200, r#"{"results": [{"content": ""}]}"#)
            .respond("duckduckgo", 200, DDG_OK)
            .respond("wikipedia", 200, WIKI_OK),
    );
    let web = web_collector(Arc::new(ApprovalGate::auto_approve()), fetcher.clone(), WebPolicy::FirstSuccess);

    let res = web.search(QUESTION);
    assert_eq!(res.sources, vec!["DuckDuckGo"]);
    assert_eq!(fetcher.executed_count(), 2);
}

struct FixedKeywords;

impl KeywordExtractor for FixedKeywords {
    fn extract(&self, _question: &str) -> Vec<String> {
        vec!["Paris".to_string(), "Louvre".to_string()]
    }
}

#[test]
fn keyword_providers_use_pluggable_extractor() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("searx", 200, SEARX_OK)
            .respond("duckduckgo", 200, DDG_OK),
    );
    let web = web_collector(Arc::new(ApprovalGate::auto_approve()), fetcher.clone(), WebPolicy::Aggregate)
        .with_keyword_extractor(Arc::new(FixedKeywords));

    let report = web.search_detailed(QUESTION);
    assert_eq!(report.keywords, vec!["Paris", "Louvre"]);
    assert_eq!(report.sources, vec!["SearX", "DuckDuckGo"]);
    assert!(report.success);
    assert!(!report.started_at.is_empty());

    let executed = fetcher.executed.lock().unwrap().clone();
    assert!(executed[0].contains("q=Qual+a+capital+da+Fran%C3%A7a%3F"));
    assert!(executed[1].contains("q=Paris+Louvre"));
    assert!(executed[2].ends_with("/summary/Paris%20Louvre"));
}

#[test]
fn detailed_report_marks_failure_with_sentinel() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let web = web_collector(Arc::new(ApprovalGate::auto_approve()), fetcher, WebPolicy::Aggregate);
    let report = web.search_detailed(QUESTION);
    assert!(!report.success);
    assert_eq!(report.text, NO_WEB_RESULTS);
    assert_eq!(report.keywords, vec!["França"]);
}
