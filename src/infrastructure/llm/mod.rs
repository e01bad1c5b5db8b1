//! Text-completion service boundary
//!
//! The adjudicator only depends on this trait; any backend that can turn
//! a prompt into text with deterministic settings will do. Failures here
//! are fully absorbed by the triage fallback.

pub mod openai;
pub mod response_parser;

pub use openai::OpenAiCompletionService;
pub use response_parser::ResponseParser;

use async_trait::async_trait;

/// Errors from the completion boundary.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion service returned status {status}")]
    Status { status: u16 },

    #[error("Completion service not configured: {0}")]
    NotConfigured(String),

    #[error("Malformed completion response: {0}")]
    InvalidResponse(String),
}

/// One completion invocation with deterministic generation settings.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Low values keep triage output stable across runs.
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Prompt in, free text out. May be unavailable, slow, or return garbage;
/// callers must tolerate all three.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
