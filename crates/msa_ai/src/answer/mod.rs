use msa_core::domain::Evidence;
use msa_core::error::AppError;

use crate::llm::{ChatMessage, ChatModel};

mod prompts;

pub use prompts::ANSWER_INSTRUCTIONS;

/// Serialize the evidence, make exactly one model call and return its text.
///
/// Model failures are returned as-is; there is no retry.
pub fn synthesize_answer(
    model: &dyn ChatModel,
    question: &str,
    evidences: &[Evidence],
    citations: &[String],
) -> Result<String, AppError> {
    let context = serde_json::to_string_pretty(evidences).map_err(|e| {
        AppError::new("AI_ANSWER_FAILED", "Failed to serialize evidence").with_details(e.to_string())
    })?;

    let reply = model.complete(&[
        ChatMessage::system(ANSWER_INSTRUCTIONS),
        ChatMessage::user(prompts::answer_user_message(question, &context, citations)),
    ])?;
    let answer = reply.into_text();
    tracing::info!(chars = answer.len(), "answer synthesized");
    Ok(answer)
}
