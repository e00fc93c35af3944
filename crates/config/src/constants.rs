//! Centralized constants for the textbook chat assistant
//!
//! Single source of truth for service endpoints, environment variable names
//! and retrieval defaults.

/// Service endpoints (defaults)
pub mod endpoints {
    /// OpenAI API endpoint
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Pinecone control plane, used to resolve an index name to its data-plane host
    pub const PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";

    /// Pinecone REST API version header value
    pub const PINECONE_API_VERSION: &str = "2024-07";

    /// Qdrant vector store endpoint
    pub const QDRANT_DEFAULT: &str = "http://127.0.0.1:6334";
}

/// Environment variable names honoured in addition to the prefixed ones
pub mod env {
    /// Prefix for layered settings (`TEXTBOOK_CHAT__SERVER__PORT=9000`)
    pub const PREFIX: &str = "TEXTBOOK_CHAT";

    /// Selects `config/{env}.*`
    pub const ENVIRONMENT: &str = "TEXTBOOK_CHAT_ENV";

    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";

    /// Index holding the innovations textbook
    pub const INDEX_INNOVATIONS: &str = "INDEX_INOVATIONS";

    /// Index holding the institutional economics textbook
    pub const INDEX_ECONOMICS: &str = "INDEX_INST_IKONOMIKA";
}

/// Model defaults
pub mod models {
    pub const EMBEDDING_DEFAULT: &str = "text-embedding-ada-002";
    pub const CHAT_DEFAULT: &str = "gpt-3.5-turbo";
    pub const TEMPERATURE_DEFAULT: f32 = 0.7;
}

/// Timeouts and retry defaults
pub mod timeouts {
    /// Embedding request timeout (seconds)
    pub const EMBEDDING_SECS: u64 = 20;

    /// Vector index query timeout (seconds)
    pub const INDEX_SECS: u64 = 20;

    /// LLM request timeout (seconds)
    pub const LLM_SECS: u64 = 60;

    pub const LLM_MAX_RETRIES: u32 = 2;
    pub const LLM_INITIAL_BACKOFF_MS: u64 = 250;
}

/// Retrieval defaults
pub mod rag {
    /// Passages fetched per index per query
    pub const DEFAULT_TOP_K: usize = 4;

    /// Payload/metadata key holding the passage text
    pub const TEXT_KEY: &str = "text";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sane() {
        assert!(rag::DEFAULT_TOP_K > 0);
        assert!((0.0..=2.0).contains(&models::TEMPERATURE_DEFAULT));
        assert!(endpoints::OPENAI_DEFAULT.starts_with("https://"));
    }
}
