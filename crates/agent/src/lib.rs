//! Question answering over the two textbooks
//!
//! Features:
//! - Answer synthesis with the fixed Bulgarian instruction and a no-evidence
//!   fallback
//! - The per-turn pipeline: embed once, route, gather, synthesize
//! - Chat sessions owning an append-only transcript
//! - HTML rendering of the transcript

pub mod pipeline;
pub mod render;
pub mod session;
pub mod synthesizer;

pub use pipeline::{QaPipeline, QaPipelineConfig, TurnAnswer};
pub use render::render_transcript;
pub use session::{ChatSession, TurnOutcome};
pub use synthesizer::AnswerSynthesizer;
