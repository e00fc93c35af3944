//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use textbook_chat_core::Subject;

use crate::constants::{endpoints, env, models, rag, timeouts};
use crate::{ConfigError, PromptsConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - missing credentials are tolerated at load time
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP server and session management
    #[serde(default)]
    pub server: ServerConfig,

    /// Shared OpenAI-compatible provider credentials
    #[serde(default)]
    pub openai: OpenAIConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    /// Subject indexes
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Instruction, fallback and chain templates
    #[serde(default)]
    pub prompts: PromptsConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate ranges and structural constraints.
    ///
    /// Credentials are checked separately by [`Settings::require_credentials`]
    /// so that tests and tooling can load settings without secrets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_llm()?;
        self.validate_index()?;
        self.validate_prompts()?;

        if self.environment.is_production() {
            self.require_credentials()?;
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "Max sessions must be at least 1".to_string(),
            });
        }

        if server.session_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.session_timeout_seconds".to_string(),
                message: "Session timeout must be at least 1 second".to_string(),
            });
        }

        if server.cleanup_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.cleanup_interval_seconds".to_string(),
                message: "Cleanup interval must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if llm.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if llm.max_tokens == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "Max tokens must be at least 1 when set".to_string(),
            });
        }

        if self.embedding.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "embedding.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    fn validate_index(&self) -> Result<(), ConfigError> {
        let index = &self.index;

        if index.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "index.top_k".to_string(),
                message: "top_k must be at least 1".to_string(),
            });
        }

        if index.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "index.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        for subject in Subject::ALL {
            let subject_config = index.for_subject(subject);
            if let Some(min_score) = subject_config.min_score {
                if !min_score.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("index.{}.min_score", subject),
                        message: format!("Must be a finite number, got {}", min_score),
                    });
                }
            }
        }

        Ok(())
    }

    fn validate_prompts(&self) -> Result<(), ConfigError> {
        if !self
            .prompts
            .retrieval_qa_system
            .contains(crate::prompts::CONTEXT_PLACEHOLDER)
        {
            return Err(ConfigError::InvalidValue {
                field: "prompts.retrieval_qa_system".to_string(),
                message: "Template must contain {context}".to_string(),
            });
        }

        if self.prompts.combined_instruction.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "prompts.combined_instruction".to_string(),
                message: "Instruction cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Check that every secret and index identifier needed to talk to the
    /// providers is present.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.openai.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "openai.api_key (or {})",
                env::OPENAI_API_KEY
            )));
        }

        if self.index.backend == IndexBackend::Pinecone
            && self.index.pinecone.api_key.trim().is_empty()
        {
            return Err(ConfigError::MissingField(format!(
                "index.pinecone.api_key (or {})",
                env::PINECONE_API_KEY
            )));
        }

        for (subject, var) in [
            (Subject::Innovations, env::INDEX_INNOVATIONS),
            (Subject::Economics, env::INDEX_ECONOMICS),
        ] {
            if self.index.for_subject(subject).name.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "index.{}.name (or {})",
                    subject, var
                )));
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum concurrent chat sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Idle time after which a session and its transcript are dropped
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}
fn default_max_sessions() -> usize {
    1000
}
fn default_session_timeout() -> u64 {
    3600
}
fn default_cleanup_interval() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
            session_timeout_seconds: default_session_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

/// OpenAI-compatible provider settings shared by embeddings and chat
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_api_key", skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,
}

// Keeps the key out of logs and panic messages.
impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn default_openai_api_key() -> String {
    std::env::var(env::OPENAI_API_KEY).unwrap_or_default()
}
fn default_openai_endpoint() -> String {
    endpoints::OPENAI_DEFAULT.to_string()
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: default_openai_api_key(),
            endpoint: default_openai_endpoint(),
        }
    }
}

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_seconds: u64,
}

fn default_embedding_model() -> String {
    models::EMBEDDING_DEFAULT.to_string()
}
fn default_embedding_timeout() -> u64 {
    timeouts::EMBEDDING_SECS
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            timeout_seconds: default_embedding_timeout(),
        }
    }
}

/// Chat completion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Unset leaves the limit to the provider
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
    /// Retries on network errors and 5xx/429 responses; 0 disables retrying
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_chat_model() -> String {
    models::CHAT_DEFAULT.to_string()
}
fn default_temperature() -> f32 {
    models::TEMPERATURE_DEFAULT
}
fn default_llm_timeout() -> u64 {
    timeouts::LLM_SECS
}
fn default_max_retries() -> u32 {
    timeouts::LLM_MAX_RETRIES
}
fn default_initial_backoff_ms() -> u64 {
    timeouts::LLM_INITIAL_BACKOFF_MS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_seconds: default_llm_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Vector index backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Pinecone,
    Qdrant,
}

/// Subject index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: IndexBackend,
    /// Passages requested per index per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_index_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default = "default_innovations_index")]
    pub innovations: SubjectIndexConfig,
    #[serde(default = "default_economics_index")]
    pub economics: SubjectIndexConfig,
}

fn default_top_k() -> usize {
    rag::DEFAULT_TOP_K
}
fn default_index_timeout() -> u64 {
    timeouts::INDEX_SECS
}
fn default_innovations_index() -> SubjectIndexConfig {
    SubjectIndexConfig::from_env(env::INDEX_INNOVATIONS)
}
fn default_economics_index() -> SubjectIndexConfig {
    SubjectIndexConfig::from_env(env::INDEX_ECONOMICS)
}

impl IndexConfig {
    pub fn for_subject(&self, subject: Subject) -> &SubjectIndexConfig {
        match subject {
            Subject::Innovations => &self.innovations,
            Subject::Economics => &self.economics,
        }
    }

    /// Fill blank index names from `INDEX_INOVATIONS` / `INDEX_INST_IKONOMIKA`.
    ///
    /// A partial `[index.<subject>]` table (only `min_score` or `host`)
    /// bypasses the table-level default, so the names are resolved again here.
    pub fn fill_names_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (config, var) in [
            (&mut self.innovations, env::INDEX_INNOVATIONS),
            (&mut self.economics, env::INDEX_ECONOMICS),
        ] {
            if config.name.trim().is_empty() {
                if let Some(name) = lookup(var).filter(|n| !n.trim().is_empty()) {
                    config.name = name;
                }
            }
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            top_k: default_top_k(),
            timeout_seconds: default_index_timeout(),
            pinecone: PineconeConfig::default(),
            qdrant: QdrantConfig::default(),
            innovations: default_innovations_index(),
            economics: default_economics_index(),
        }
    }
}

/// One subject's index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectIndexConfig {
    /// Pinecone index name or Qdrant collection name
    #[serde(default)]
    pub name: String,
    /// Pinecone data-plane host; resolved via the control plane when unset
    #[serde(default)]
    pub host: Option<String>,
    /// Passages scoring below this are discarded before routing.
    /// Unset means every returned passage counts as a hit.
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl SubjectIndexConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn from_env(var: &str) -> Self {
        Self::new(std::env::var(var).unwrap_or_default())
    }
}

/// Pinecone credentials and routing
#[derive(Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default = "default_pinecone_api_key", skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_pinecone_control_plane")]
    pub control_plane_url: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl std::fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &redact(&self.api_key))
            .field("control_plane_url", &self.control_plane_url)
            .field("namespace", &self.namespace)
            .finish()
    }
}

fn default_pinecone_api_key() -> String {
    std::env::var(env::PINECONE_API_KEY).unwrap_or_default()
}
fn default_pinecone_control_plane() -> String {
    endpoints::PINECONE_CONTROL_PLANE.to_string()
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: default_pinecone_api_key(),
            control_plane_url: default_pinecone_control_plane(),
            namespace: None,
        }
    }
}

/// Qdrant connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    #[serde(default = "default_qdrant_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Payload key holding the passage text
    #[serde(default = "default_text_key")]
    pub text_key: String,
}

fn default_qdrant_endpoint() -> String {
    endpoints::QDRANT_DEFAULT.to_string()
}
fn default_text_key() -> String {
    rag::TEXT_KEY.to_string()
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            endpoint: default_qdrant_endpoint(),
            api_key: None,
            text_key: default_text_key(),
        }
    }
}

/// Query routing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Use the routing probe results as evidence instead of querying the
    /// selected indexes a second time
    #[serde(default = "default_true")]
    pub reuse_probe_results: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            reuse_probe_results: true,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Load settings from `config/` in the working directory and the environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings with layered sources:
/// `{dir}/default.*` -> `{dir}/{env}.*` -> `TEXTBOOK_CHAT__*` variables
pub fn load_settings_from(dir: &Path, env_name: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_path = dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    if let Some(env_name) = env_name {
        let env_path = dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(env::PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;
    settings
        .index
        .fill_names_from(|var| std::env::var(var).ok());

    settings.validate()?;

    Ok(settings)
}
