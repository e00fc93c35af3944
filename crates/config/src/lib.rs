//! Configuration management for the textbook chat assistant
//!
//! Supports loading configuration from:
//! - TOML/YAML/JSON files under `config/`
//! - Environment variables (`TEXTBOOK_CHAT__` prefix)
//! - The plain variables the deployment already uses
//!   (`OPENAI_API_KEY`, `PINECONE_API_KEY`, `INDEX_INOVATIONS`,
//!   `INDEX_INST_IKONOMIKA`)

pub mod constants;
pub mod prompts;
pub mod settings;

pub use prompts::PromptsConfig;
pub use settings::{
    load_settings, load_settings_from, EmbeddingConfig, IndexBackend, IndexConfig, LlmConfig,
    ObservabilityConfig, OpenAIConfig, PineconeConfig, QdrantConfig, RoutingConfig,
    RuntimeEnvironment, ServerConfig, Settings, SubjectIndexConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for textbook_chat_core::Error {
    fn from(err: ConfigError) -> Self {
        textbook_chat_core::Error::Config(err.to_string())
    }
}
