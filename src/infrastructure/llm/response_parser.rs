//! JSON extraction from free-text completions
//!
//! Model output may wrap the requested JSON in narrative text or code
//! fences. Extraction finds the first balanced JSON value rather than
//! trusting the surrounding text.

use serde::de::DeserializeOwned;

use super::CompletionError;

/// Utilities for pulling a structured object out of a completion.
pub struct ResponseParser;

impl ResponseParser {
    /// Parse a JSON value from completion text.
    ///
    /// Strategy order: the full trimmed content, then a ```json fenced
    /// block, then the first balanced JSON object/array found anywhere in
    /// the text.
    pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, CompletionError> {
        let trimmed = content.trim();
        if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
            return Ok(parsed);
        }

        if let Some(block) = Self::extract_fenced_block(trimmed) {
            if let Ok(parsed) = serde_json::from_str::<T>(&block) {
                return Ok(parsed);
            }
        }

        if let Some(candidate) = Self::extract_first_json_value(trimmed) {
            if let Ok(parsed) = serde_json::from_str::<T>(&candidate) {
                return Ok(parsed);
            }
        }

        Err(CompletionError::InvalidResponse(
            "no parsable JSON value in completion text".to_string(),
        ))
    }

    /// First balanced JSON object or array embedded in the text.
    ///
    /// Uses a streaming deserializer to detect a valid JSON prefix, which
    /// handles braces inside string literals correctly.
    pub fn extract_first_json_value(content: &str) -> Option<String> {
        for (idx, ch) in content.char_indices() {
            if ch == '{' || ch == '[' {
                let candidate = &content[idx..];
                let mut stream = serde_json::Deserializer::from_str(candidate)
                    .into_iter::<serde_json::Value>();
                if let Some(Ok(_)) = stream.next() {
                    let end = stream.byte_offset();
                    if end > 0 && end <= candidate.len() {
                        return Some(candidate[..end].to_string());
                    }
                }
            }
        }
        None
    }

    fn extract_fenced_block(content: &str) -> Option<String> {
        let fence = "```";
        let start = content.find(fence)?;
        let after_start = &content[start + fence.len()..];
        let body_start = after_start.find('\n')? + 1;
        let body = &after_start[body_start..];
        let end = body.find(fence)?;
        Some(body[..end].trim().to_string())
    }
}
