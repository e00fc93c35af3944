//! Prompt templates and user-facing strings
//!
//! The defaults reproduce the textbook assistant's wording. Every template can
//! be overridden from the `[prompts]` section of the configuration.

use serde::{Deserialize, Serialize};

/// Instruction prepended to every question before synthesis.
/// The question is appended after a single newline.
pub const COMBINED_INSTRUCTION: &str = "Ти си студент и разполагаш с учебници по иновации и институционална икономика. Отговори на въпроса, базирайки се само на информацията от тези учебници. Отговорът трябва да бъде на български език, точен и изчерпателен.\n\nВъпрос:";

/// Answer used when no passage was retrieved from either textbook
pub const NO_EVIDENCE_MESSAGE: &str =
    "Не намирам релевантна информация за този въпрос в учебниците.";

/// Answer recorded when a provider fails during a turn
pub const UNAVAILABLE_MESSAGE: &str =
    "Услугата временно не е достъпна. Моля, опитайте отново по-късно.";

/// System message of the retrieval-QA chain; `{context}` receives the passages
pub const RETRIEVAL_QA_SYSTEM: &str =
    "Answer any use questions based solely on the context below:\n\n<context>\n{context}\n</context>";

/// Placeholder substituted with the joined passage texts
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Static page chrome
pub mod page {
    pub const TITLE: &str = "📚 inovations & Economics Chatbot";
    pub const SUBTITLE: &str =
        "Ask questions related to 'иновации' and 'институционална икономика'.";
    pub const INPUT_LABEL: &str = "Въведете вашия въпрос:";
    pub const SEND_BUTTON: &str = "Send";
    pub const LOADING: &str = "Анализирам въпроса...";
}

/// Overridable prompt templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "default_combined_instruction")]
    pub combined_instruction: String,
    #[serde(default = "default_no_evidence")]
    pub no_evidence_message: String,
    #[serde(default = "default_unavailable")]
    pub unavailable_message: String,
    /// Must contain `{context}`
    #[serde(default = "default_retrieval_qa_system")]
    pub retrieval_qa_system: String,
}

fn default_combined_instruction() -> String {
    COMBINED_INSTRUCTION.to_string()
}
fn default_no_evidence() -> String {
    NO_EVIDENCE_MESSAGE.to_string()
}
fn default_unavailable() -> String {
    UNAVAILABLE_MESSAGE.to_string()
}
fn default_retrieval_qa_system() -> String {
    RETRIEVAL_QA_SYSTEM.to_string()
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            combined_instruction: default_combined_instruction(),
            no_evidence_message: default_no_evidence(),
            unavailable_message: default_unavailable(),
            retrieval_qa_system: default_retrieval_qa_system(),
        }
    }
}

impl PromptsConfig {
    /// Instruction for one question: the combined instruction, a newline,
    /// then the question. Sessions pass it already trimmed.
    pub fn instruction_for(&self, question: &str) -> String {
        format!("{}\n{}", self.combined_instruction, question)
    }
}
