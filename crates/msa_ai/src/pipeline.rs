use std::sync::Arc;

use msa_core::domain::AgentState;
use msa_core::error::AppError;

use crate::answer::synthesize_answer;
use crate::collect::EvidenceCollector;
use crate::llm::ChatModel;
use crate::router::route_question;

/// Router, then evidence collection, then answer synthesis; strictly in sequence.
pub struct Pipeline {
    model: Arc<dyn ChatModel>,
    collector: EvidenceCollector,
}

impl Pipeline {
    pub fn new(model: Arc<dyn ChatModel>, collector: EvidenceCollector) -> Self {
        Self { model, collector }
    }

    /// Run every stage for one question. Router and synthesizer failures are fatal.
    pub fn ask(&self, question: &str) -> Result<AgentState, AppError> {
        tracing::info!(question, "pipeline started");
        let state = AgentState::new(question);
        let state = self.route(state)?;
        let state = self.collect(state)?;
        self.answer(state)
    }

    pub fn route(&self, state: AgentState) -> Result<AgentState, AppError> {
        let routes = route_question(self.model.as_ref(), &state.question)?;
        Ok(state.with_routes(routes))
    }

    pub fn collect(&self, state: AgentState) -> Result<AgentState, AppError> {
        let routes = state.routes.clone().ok_or_else(|| {
            AppError::new("PIPELINE_STATE_INVALID", "Evidence collection requires routes")
        })?;
        let collected = self.collector.collect(&state.question, &routes);
        Ok(state.with_evidence(collected.evidences, collected.citations))
    }

    pub fn answer(&self, state: AgentState) -> Result<AgentState, AppError> {
        let answer = synthesize_answer(
            self.model.as_ref(),
            &state.question,
            state.evidences(),
            state.citations(),
        )?;
        Ok(state.with_answer(answer))
    }

    /// Start a new approval session: the next outbound command prompts again.
    pub fn reset_session(&self) {
        self.collector.web().gate().reset();
    }
}
