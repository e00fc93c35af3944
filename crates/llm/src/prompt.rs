//! Prompt building
//!
//! Builds the two-message retrieval-QA chat: a system message carrying every
//! retrieved passage and a user message carrying the instruction.

use std::fmt;

use serde::{Deserialize, Serialize};
use textbook_chat_config::prompts::CONTEXT_PLACEHOLDER;
use textbook_chat_core::Passage;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Join passage texts with a blank line, in the order given
pub fn format_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt builder
///
/// ```ignore
/// let messages = PromptBuilder::new(&prompts.retrieval_qa_system)
///     .context(&passages)
///     .user(instruction)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_template: String,
    context: String,
    messages: Vec<Message>,
}

impl PromptBuilder {
    /// Start from a system template containing `{context}`
    pub fn new(system_template: impl Into<String>) -> Self {
        Self {
            system_template: system_template.into(),
            context: String::new(),
            messages: Vec::new(),
        }
    }

    /// Set the passages that fill `{context}`
    pub fn context(mut self, passages: &[Passage]) -> Self {
        self.context = format_context(passages);
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// System message first, then the accumulated messages
    pub fn build(self) -> Vec<Message> {
        let system = self
            .system_template
            .replace(CONTEXT_PLACEHOLDER, &self.context);

        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(system));
        messages.extend(self.messages);
        messages
    }
}
