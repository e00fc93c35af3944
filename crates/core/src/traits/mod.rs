//! Provider traits for the question-answering workflow
//!
//! All external collaborators sit behind these traits so backends can be
//! swapped through configuration and replaced with mocks in tests.
//!
//! ```text
//! Embedder:           text -> dense vector
//! SubjectIndex:       query vector -> top-k passages of one collection
//! CompletionProvider: instruction + grounding passages -> answer text
//! ```

mod completion;
mod embedding;
mod index;

pub use completion::CompletionProvider;
pub use embedding::Embedder;
pub use index::{Passage, SubjectIndex};
