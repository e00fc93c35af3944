//! Core traits and types for the textbook chat assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Provider traits for pluggable backends (embeddings, vector indexes, completions)
//! - Subject definitions for the two textbook collections
//! - Conversation transcript types
//! - Error types

pub mod conversation;
pub mod error;
pub mod subject;
pub mod traits;

pub use conversation::{ConversationTurn, Transcript, TurnRole};
pub use error::{Error, Result};
pub use subject::{Subject, SubjectSelection};

pub use traits::{CompletionProvider, Embedder, Passage, SubjectIndex};
