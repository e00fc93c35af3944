//! Conversation transcript types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Question typed by the user
    User,
    /// Answer produced by the assistant
    Bot,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Bot => "bot",
        }
    }

    /// Label shown next to the message
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Bot => "Bot",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: TurnRole,
    message: String,
    timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::new(TurnRole::User, message)
    }

    pub fn bot(message: impl Into<String>) -> Self {
        Self::new(TurnRole::Bot, message)
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Append-only record of a conversation.
///
/// There is deliberately no way to remove or reorder turns; the transcript
/// lives exactly as long as the session that owns it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single turn
    pub fn append_turn(&mut self, role: TurnRole, message: impl Into<String>) {
        self.turns.push(ConversationTurn::new(role, message));
    }

    /// Append a question and its answer as one unit: (user, question)
    /// immediately followed by (bot, answer).
    pub fn append_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.reserve(2);
        self.turns.push(ConversationTurn::user(question));
        self.turns.push(ConversationTurn::bot(answer));
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of completed question/answer exchanges
    pub fn exchange_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == TurnRole::Bot)
            .count()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }
}
