//! LLM integration for grounded answers
//!
//! Features:
//! - OpenAI-compatible chat completion backend with retry and backoff
//! - Retrieval-QA prompt construction ("stuff" every passage into the
//!   system message)
//! - Adapter exposing a backend as the core `CompletionProvider`

pub mod adapter;
pub mod backend;
pub mod prompt;

pub use adapter::StuffDocumentsAdapter;
pub use backend::{FinishReason, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use prompt::{format_context, Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for textbook_chat_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => textbook_chat_core::Error::Timeout("chat completion".to_string()),
            LlmError::Configuration(msg) => textbook_chat_core::Error::Config(msg),
            other => textbook_chat_core::Error::Completion(other.to_string()),
        }
    }
}
