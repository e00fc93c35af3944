//! Chat session
//!
//! One browser conversation: an id and an append-only transcript. A session
//! is created on first contact and dropped when it ends; nothing is
//! persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use textbook_chat_core::{Result, SubjectSelection, Transcript, TurnRole};

use crate::pipeline::QaPipeline;
use crate::render::render_transcript;

/// Result of one submitted question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// `None` when the turn failed before routing finished
    pub selection: Option<SubjectSelection>,
    /// Text appended as the bot turn
    pub answer: String,
    /// Whether a provider failure replaced the answer
    pub failed: bool,
}

#[derive(Debug)]
pub struct ChatSession {
    id: String,
    created_at: DateTime<Utc>,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            transcript: Transcript::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn append_turn(&mut self, role: TurnRole, message: impl Into<String>) {
        self.transcript.append_turn(role, message);
    }

    /// Process one question and record it.
    ///
    /// Blank input is ignored and returns `None`. Otherwise exactly two turns
    /// are appended: the question, then either the answer or the
    /// unavailable message when a provider failed.
    pub async fn ask(&mut self, pipeline: &QaPipeline, question: &str) -> Option<TurnOutcome> {
        let question = question.trim();
        if question.is_empty() {
            tracing::debug!(session_id = %self.id, "Ignoring blank question");
            return None;
        }

        let outcome = match pipeline.run(question).await {
            Ok(turn) => TurnOutcome {
                selection: Some(turn.selection),
                answer: turn.answer,
                failed: false,
            },
            Err(e) => {
                tracing::error!(
                    session_id = %self.id,
                    error = %e,
                    provider_failure = e.is_provider_failure(),
                    "Turn failed"
                );
                TurnOutcome {
                    selection: None,
                    answer: pipeline.prompts().unavailable_message.clone(),
                    failed: true,
                }
            }
        };

        self.transcript.append_exchange(question, outcome.answer.clone());
        Some(outcome)
    }

    /// Render the full transcript as HTML
    pub fn render(&self) -> Result<String> {
        render_transcript(&self.transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = ChatSession::new("s-1");
        assert_eq!(session.id(), "s-1");
        assert!(session.transcript().is_empty());
        assert!(session.created_at() <= Utc::now());
    }

    #[test]
    fn test_append_turn_and_render() {
        let mut session = ChatSession::new("s-1");
        session.append_turn(TurnRole::User, "q");
        session.append_turn(TurnRole::Bot, "a");

        assert_eq!(session.transcript().len(), 2);
        let first = session.render().unwrap();
        assert_eq!(first, session.render().unwrap());
        assert!(first.contains("<strong>Bot:</strong> a"));
    }
}
