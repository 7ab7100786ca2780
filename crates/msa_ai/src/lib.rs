pub mod answer;
pub mod collect;
pub mod docs;
pub mod embeddings;
pub mod llm;
pub mod ollama;
pub mod pipeline;
pub mod router;
pub mod web;

pub use pipeline::Pipeline;
