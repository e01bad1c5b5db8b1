//! OpenAI-compatible completion backend
//!
//! Works with the OpenAI API and any service exposing the same
//! `/chat/completions` shape (local inference servers included).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionError, CompletionRequest, CompletionService};
use crate::config::LlmConfig;

/// Completion provider speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompletionService {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompletionService {
    pub fn new(config: &LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build completion HTTP client with timeout, using default");
                Client::new()
            });

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionService {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CompletionError::NotConfigured("no API key configured".to_string())
        })?;

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CompletionError::Status {
                status: response.status().as_u16(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                CompletionError::InvalidResponse("response carried no choices".to_string())
            })?;

        debug!(model = %self.model, chars = text.len(), "Completion received");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
