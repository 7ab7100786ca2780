use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use msa_ai::collect::{collect_sql, EvidenceCollector};
use msa_ai::docs::{DocIndex, SemanticIndex};
use msa_ai::embeddings::ollama_embed::OllamaEmbedder;
use msa_ai::embeddings::openai_embed::OpenAiEmbedder;
use msa_ai::embeddings::Embedder;
use msa_ai::llm::ollama_chat::OllamaChat;
use msa_ai::llm::openai_chat::OpenAiChat;
use msa_ai::llm::ChatModel;
use msa_ai::ollama::OllamaClient;
use msa_ai::web::approval::{is_affirmative, ApprovalGate, Prompter};
use msa_ai::web::fetch::UreqFetcher;
use msa_ai::web::WebCollector;
use msa_ai::Pipeline;
use msa_core::config::{AgentConfig, CollectionMode, LlmProvider};
use msa_core::db::{SqliteDirectory, StructuredSource};
use msa_core::domain::AgentState;
use msa_core::error::AppError;

#[derive(Debug, Parser)]
#[command(name = "msa", version, about = "Answer questions from SQLite, local documents and the web")]
pub struct Cli {
    /// JSON config file; environment variables and flags override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Approve every outbound web command without prompting.
    #[arg(long, global = true)]
    pub auto_approve: bool,

    /// Collect SQL and document evidence in parallel.
    #[arg(long, global = true)]
    pub concurrent: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Route, collect evidence and answer each question in turn.
    Ask {
        #[arg(required = true)]
        questions: Vec<String>,
        /// Re-lock web approval before every question.
        #[arg(long)]
        session_per_question: bool,
    },
    /// Run only the web collector and print its report as JSON.
    Web { question: String },
    /// Query the local document index and print the hits as JSON.
    Docs {
        query: String,
        #[arg(short, default_value_t = 3)]
        k: usize,
    },
    /// Dump the SQL evidence every question would see, as JSON.
    Sql,
}

pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Prefix match: covers msa_core, msa_ai and msa_app too.
    let filter = match cli.verbose {
        0 => "msa=info",
        1 => "msa=debug",
        _ => "msa=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

/// Config file and environment, then the command-line switches.
pub fn resolve_config(cli: &Cli) -> Result<AgentConfig, AppError> {
    let mut cfg = AgentConfig::load(cli.config.as_deref())?;
    apply_flags(&mut cfg, cli);
    Ok(cfg)
}

fn apply_flags(cfg: &mut AgentConfig, cli: &Cli) {
    if cli.auto_approve {
        cfg.web.auto_approve = true;
    }
    if cli.concurrent {
        cfg.pipeline.collection = CollectionMode::Concurrent;
    }
}

/// Shows the pending command and reads one line of consent.
///
/// End of input and read errors surface as `APPROVAL_PROMPT_FAILED`; the gate
/// treats those as a rejection.
pub struct LinePrompter {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl LinePrompter {
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// stdin for answers, stderr for the prompt.
    pub fn terminal() -> Self {
        Self::new(Box::new(BufReader::new(io::stdin())), Box::new(io::stderr()))
    }
}

impl Prompter for LinePrompter {
    fn confirm(&self, command: &str) -> Result<bool, AppError> {
        let io_err = |e: io::Error| {
            AppError::new("APPROVAL_PROMPT_FAILED", "Failed to talk to the operator")
                .with_details(e.to_string())
        };

        {
            let mut out = self.output.lock().unwrap_or_else(|p| p.into_inner());
            writeln!(out, "About to execute outbound command:").map_err(io_err)?;
            writeln!(out, "  {command}").map_err(io_err)?;
            write!(out, "Allow web access for this session? [y/N] ").map_err(io_err)?;
            out.flush().map_err(io_err)?;
        }

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .read_line(&mut line)
            .map_err(io_err)?;
        if read == 0 {
            return Err(AppError::new("APPROVAL_PROMPT_FAILED", "Input closed before an answer was given"));
        }
        Ok(is_affirmative(&line))
    }
}

fn ollama_client(cfg: &AgentConfig) -> Result<OllamaClient, AppError> {
    Ok(OllamaClient::new(&cfg.model.ollama_base_url)?.with_timeout(Duration::from_secs(cfg.model.timeout_secs)))
}

pub fn build_chat_model(cfg: &AgentConfig) -> Result<Arc<dyn ChatModel>, AppError> {
    let timeout = Duration::from_secs(cfg.model.timeout_secs);
    let model: Arc<dyn ChatModel> = match cfg.model.provider {
        LlmProvider::Openai => Arc::new(OpenAiChat::new(
            &cfg.model.openai_base_url,
            &cfg.model.openai_api_key,
            &cfg.model.chat_model,
            timeout,
        )),
        LlmProvider::Ollama => {
            let client = ollama_client(cfg)?;
            if let Err(e) = client.health_check() {
                tracing::warn!(base_url = client.base_url(), error = %e, "ollama is not answering; model calls will fail");
            }
            Arc::new(OllamaChat::new(client, &cfg.model.chat_model))
        }
    };
    Ok(model)
}

pub fn build_embedder(cfg: &AgentConfig) -> Result<Arc<dyn Embedder>, AppError> {
    let embedder: Arc<dyn Embedder> = match cfg.model.provider {
        LlmProvider::Openai => Arc::new(OpenAiEmbedder::new(
            &cfg.model.openai_base_url,
            &cfg.model.openai_api_key,
            Duration::from_secs(cfg.model.timeout_secs),
        )),
        LlmProvider::Ollama => Arc::new(OllamaEmbedder::new(ollama_client(cfg)?)),
    };
    Ok(embedder)
}

/// Index the documents directory. A failed build leaves an empty index so the
/// rest of the pipeline still runs.
pub fn build_doc_index(cfg: &AgentConfig) -> Result<DocIndex, AppError> {
    let embedder = build_embedder(cfg)?;
    let model = cfg.model.embeddings_model.as_str();
    match DocIndex::build_from_dir(&cfg.data.docs_dir, embedder.clone(), model) {
        Ok(index) => {
            let status = index.status();
            tracing::info!(
                documents = status.document_count,
                chunks = status.chunk_count,
                "document index ready"
            );
            Ok(index)
        }
        Err(e) => {
            tracing::warn!(error = %e, "document index build failed; document search disabled");
            Ok(DocIndex::empty(embedder, model))
        }
    }
}

pub fn build_gate(cfg: &AgentConfig, prompter: Arc<dyn Prompter>) -> ApprovalGate {
    if cfg.web.auto_approve {
        ApprovalGate::auto_approve()
    } else {
        ApprovalGate::interactive(prompter)
    }
}

pub fn build_web_collector(cfg: &AgentConfig, prompter: Arc<dyn Prompter>) -> WebCollector {
    let fetcher = Arc::new(UreqFetcher::new(Duration::from_secs(cfg.web.timeout_secs)));
    WebCollector::new(cfg.web.clone(), Arc::new(build_gate(cfg, prompter)), fetcher)
}

pub fn build_pipeline(cfg: &AgentConfig, prompter: Arc<dyn Prompter>) -> Result<Pipeline, AppError> {
    let model = build_chat_model(cfg)?;
    let index = build_doc_index(cfg)?;
    let collector = EvidenceCollector::new(
        Arc::new(SqliteDirectory::new(cfg.data.sqlite_dir.clone())),
        build_web_collector(cfg, prompter),
    )
    .with_docs_index(Arc::new(index))
    .with_mode(cfg.pipeline.collection)
    .with_docs_top_k(cfg.pipeline.docs_top_k);
    Ok(Pipeline::new(model, collector))
}

/// Citations first, then the answer.
pub fn render_answer(state: &AgentState) -> String {
    let mut out = String::new();
    out.push_str("Sources:\n");
    if state.citations().is_empty() {
        out.push_str("  (none)\n");
    }
    for citation in state.citations() {
        out.push_str("  - ");
        out.push_str(citation);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(state.final_answer.as_deref().unwrap_or_default());
    out.push('\n');
    out
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("OUTPUT_SERIALIZE_FAILED", "Failed to render output").with_details(e.to_string())
    })?;
    println!("{text}");
    Ok(())
}

pub fn run(cli: &Cli) -> Result<(), AppError> {
    let cfg = resolve_config(cli)?;
    let prompter: Arc<dyn Prompter> = Arc::new(LinePrompter::terminal());

    match &cli.command {
        Command::Ask {
            questions,
            session_per_question,
        } => {
            let pipeline = build_pipeline(&cfg, prompter)?;
            for (i, question) in questions.iter().enumerate() {
                if *session_per_question && i > 0 {
                    pipeline.reset_session();
                }
                let state = pipeline.ask(question)?;
                if questions.len() > 1 {
                    println!("== {question}");
                }
                print!("{}", render_answer(&state));
            }
            Ok(())
        }
        Command::Web { question } => {
            let report = build_web_collector(&cfg, prompter).search_detailed(question);
            print_json(&report)
        }
        Command::Docs { query, k } => {
            let index = build_doc_index(&cfg)?;
            let hits = index.query(query, (*k).max(1))?;
            print_json(&hits)
        }
        Command::Sql => {
            let source = SqliteDirectory::new(cfg.data.sqlite_dir.clone());
            tracing::debug!(dir = %source.dir().display(), "dumping SQL evidence");
            let containers = source.list_containers()?;
            let (evidences, citations) = collect_sql(&source);
            print_json(&serde_json::json!({
                "containers": containers,
                "citations": citations,
                "evidences": evidences,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msa_core::config::WebPolicy;
    use msa_core::domain::{Evidence, DocsEvidence, Route, RouteSet};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse")
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn parses_ask_with_global_flags() {
        let cli = parse(&["msa", "-vv", "ask", "--auto-approve", "q1", "q2", "--session-per-question"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.auto_approve);
        match cli.command {
            Command::Ask {
                questions,
                session_per_question,
            } => {
                assert_eq!(questions, vec!["q1".to_string(), "q2".to_string()]);
                assert!(session_per_question);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ask_requires_a_question() {
        assert!(Cli::try_parse_from(["msa", "ask"]).is_err());
    }

    #[test]
    fn docs_defaults_to_three_hits() {
        let cli = parse(&["msa", "--log-format", "json", "docs", "leave policy"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Docs { query, k } => {
                assert_eq!(query, "leave policy");
                assert_eq!(k, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_override_loaded_config() {
        let cli = parse(&["msa", "--concurrent", "--auto-approve", "sql"]);
        let mut cfg = AgentConfig::default();
        cfg.web.policy = WebPolicy::FirstSuccess;
        apply_flags(&mut cfg, &cli);
        assert!(cfg.web.auto_approve);
        assert_eq!(cfg.pipeline.collection, CollectionMode::Concurrent);
        assert_eq!(cfg.web.policy, WebPolicy::FirstSuccess);
    }

    #[test]
    fn line_prompter_shows_command_and_reads_answer() {
        let out = SharedBuf::default();
        let prompter = LinePrompter::new(Box::new(Cursor::new(b"sim\nno\n".to_vec())), Box::new(out.clone()));

        assert!(prompter.confirm("GET https://api.duckduckgo.com/?q=Paris").expect("confirm"));
        assert!(!prompter.confirm("GET https://example.org").expect("confirm"));

        let shown = String::from_utf8(out.0.lock().unwrap().clone()).expect("utf8");
        assert!(shown.contains("GET https://api.duckduckgo.com/?q=Paris"));
        assert!(shown.contains("[y/N]"));
    }

    #[test]
    fn line_prompter_fails_on_closed_input() {
        let prompter = LinePrompter::new(Box::new(Cursor::new(Vec::new())), Box::new(io::sink()));
        let err = prompter.confirm("GET https://example.org").expect_err("should fail");
        assert_eq!(err.code, "APPROVAL_PROMPT_FAILED");
    }

    #[test]
    fn gate_follows_auto_approve_setting() {
        let prompter: Arc<dyn Prompter> =
            Arc::new(LinePrompter::new(Box::new(Cursor::new(Vec::new())), Box::new(io::sink())));
        let mut cfg = AgentConfig::default();
        assert!(!build_gate(&cfg, prompter.clone()).request("GET https://example.org").is_approved());
        cfg.web.auto_approve = true;
        assert!(build_gate(&cfg, prompter).request("GET https://example.org").is_approved());
    }

    #[test]
    fn renders_citations_before_answer() {
        let state = AgentState::new("q")
            .with_routes(RouteSet::new([Route::Docs]))
            .with_evidence(
                vec![Evidence::Docs(DocsEvidence { snippets: vec![] })],
                vec!["docs:local".to_string()],
            )
            .with_answer("Nothing in the handbook.");
        assert_eq!(
            render_answer(&state),
            "Sources:\n  - docs:local\n\nNothing in the handbook.\n"
        );
    }
}
