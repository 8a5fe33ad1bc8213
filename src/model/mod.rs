//! External model service used by the fallback extractor
//!
//! This module contains:
//! - The `ModelClient` capability the fallback extractor calls
//! - `OpenAiClient`, a chat-completions adapter over reqwest

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the model service
#[derive(Debug, Error)]
pub enum ModelError {
    /// Connection failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response or an empty choice list
    #[error("API error: {0}")]
    Api(String),

    /// The response envelope could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Upper bound on response tokens
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Accepts a prompt and returns free-form text expected to be JSON
///
/// Implementations must be shareable across pipeline tasks. Tests use
/// canned implementations; nothing asserts on real model output.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Requests a completion and returns the text of the first choice
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError>;
}
