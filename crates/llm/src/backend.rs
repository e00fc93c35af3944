//! LLM Backend implementations
//!
//! One OpenAI-compatible chat completion backend. Requests are
//! non-streaming: the whole answer is returned at once and appended to the
//! transcript verbatim.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use textbook_chat_config::Settings;

use crate::prompt::{Message, Role};
use crate::LlmError;

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Generated text
    pub text: String,
    /// Completion tokens reported by the provider
    pub tokens: usize,
    /// Total generation time (ms), retries included
    pub total_time_ms: u64,
    pub finish_reason: FinishReason,
}

/// Finish reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a response
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError>;

    /// Check if model is available
    async fn is_available(&self) -> bool;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Configuration for OpenAI-compatible backends
#[derive(Clone)]
pub struct OpenAIConfig {
    /// API endpoint (e.g. https://api.openai.com/v1)
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Unset leaves the limit to the provider
    pub max_tokens: Option<u32>,
    /// Temperature (0-2)
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: None,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl OpenAIConfig {
    /// Create config for OpenAI
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Build from application settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            endpoint: settings.openai.endpoint.clone(),
            api_key: settings.openai.api_key.clone(),
            model: settings.llm.model.clone(),
            max_tokens: settings.llm.max_tokens,
            temperature: settings.llm.temperature,
            timeout: Duration::from_secs(settings.llm.timeout_seconds),
            max_retries: settings.llm.max_retries,
            initial_backoff: Duration::from_millis(settings.llm.initial_backoff_ms),
        }
    }
}

/// OpenAI-compatible backend
///
/// Works with OpenAI itself and any server exposing `/chat/completions`
/// (vLLM, Ollama's OpenAI mode, local proxies).
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    /// Create new OpenAI backend
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() && !is_local(&config.endpoint) {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::HeaderValue;

        let mut headers = reqwest::header::HeaderMap::new();

        if !self.config.api_key.is_empty() {
            let auth_value = format!("Bearer {}", self.config.api_key);
            if let Ok(val) = HeaderValue::from_str(&auth_value) {
                headers.insert(reqwest::header::AUTHORIZATION, val);
            }
        }

        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        headers
    }

    fn build_request(&self, messages: &[Message]) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: match m.role {
                        Role::System => "system".to_string(),
                        Role::User => "user".to_string(),
                        Role::Assistant => "assistant".to_string(),
                    },
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            stream: Some(false),
        }
    }

    /// Execute a single request (used by retry logic)
    async fn execute_request(
        &self,
        request: &OpenAIChatRequest,
    ) -> Result<OpenAIChatResponse, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            // 5xx and rate limiting are retryable, other 4xx are not
            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::Network(format!("HTTP {}: {}", status, error)));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &LlmError) -> bool {
        matches!(error, LlmError::Network(_) | LlmError::Timeout)
    }
}

fn is_local(endpoint: &str) -> bool {
    endpoint.starts_with("http://localhost") || endpoint.starts_with("http://127.0.0.1")
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    /// Generate a response, retrying transient failures with exponential backoff
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.build_request(messages);

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "LLM request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&request).await {
                Ok(response) => {
                    let choice = response.choices.into_iter().next().ok_or_else(|| {
                        LlmError::InvalidResponse("No choices in response".to_string())
                    })?;

                    let total_time_ms = start.elapsed().as_millis() as u64;
                    let tokens = response.usage.map(|u| u.completion_tokens).unwrap_or(0);

                    tracing::debug!(
                        model = %self.config.model,
                        tokens,
                        total_time_ms,
                        attempts = attempt + 1,
                        "Chat completion finished"
                    );

                    return Ok(GenerationResult {
                        text: choice.message.content,
                        tokens,
                        total_time_ms,
                        finish_reason: match choice.finish_reason.as_deref() {
                            Some("length") => FinishReason::Length,
                            Some("content_filter") => FinishReason::ContentFilter,
                            _ => FinishReason::Stop,
                        },
                    });
                }
                Err(e) if Self::is_retryable(&e) => {
                    last_error = Some(e);
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.config.endpoint.trim_end_matches('/'));
        self.client
            .get(&url)
            .headers(self.build_headers())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serve `/chat/completions`, failing with `fail_status` for the first
    /// `failures` calls. Returns the base URL and the call counter.
    async fn mock_server(failures: usize, fail_status: StatusCode) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));

        async fn handler(
            State((calls, failures, fail_status)): State<(Arc<AtomicUsize>, usize, StatusCode)>,
            Json(body): Json<serde_json::Value>,
        ) -> Result<Json<serde_json::Value>, StatusCode> {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                return Err(fail_status);
            }
            let last = body["messages"]
                .as_array()
                .and_then(|m| m.last())
                .and_then(|m| m["content"].as_str())
                .unwrap_or_default()
                .to_string();
            Ok(Json(serde_json::json!({
                "choices": [{
                    "message": {"role": "assistant", "content": format!("echo: {}", last)},
                    "finish_reason": "stop"
                }],
                "usage": {"completion_tokens": 3, "prompt_tokens": 10, "total_tokens": 13}
            })))
        }

        let app = Router::new()
            .route("/chat/completions", post(handler))
            .with_state((calls.clone(), failures, fail_status));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://127.0.0.1:{}", addr.port()), calls)
    }

    fn local_config(endpoint: String, max_retries: u32) -> OpenAIConfig {
        OpenAIConfig {
            endpoint,
            max_retries,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_openai_config_default() {
        let config = OpenAIConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.temperature, 0.7);
        assert!(config.max_tokens.is_none());
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.openai.api_key = "sk-xxx".to_string();
        settings.llm.max_retries = 0;
        settings.llm.max_tokens = Some(512);

        let config = OpenAIConfig::from_settings(&settings);
        assert_eq!(config.api_key, "sk-xxx");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.max_tokens, Some(512));
        assert!(!format!("{:?}", config).contains("sk-xxx"));
    }

    #[test]
    fn test_openai_backend_creation() {
        assert!(OpenAIBackend::new(OpenAIConfig::default()).is_err());
        assert!(OpenAIBackend::new(OpenAIConfig::openai("sk-xxx", "gpt-4")).is_ok());
        assert!(OpenAIBackend::new(local_config("http://localhost:8000".into(), 0)).is_ok());
    }

    #[test]
    fn test_chat_url() {
        let mut config = OpenAIConfig::openai("sk-xxx", "gpt-4");
        config.endpoint = "https://api.openai.com/v1/".to_string();
        let backend = OpenAIBackend::new(config).unwrap();
        assert_eq!(backend.chat_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization() {
        let backend = OpenAIBackend::new(OpenAIConfig::openai("sk-xxx", "gpt-4")).unwrap();
        let request = backend.build_request(&[Message::system("ctx"), Message::user("q")]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "q");
        assert_eq!(json["stream"], false);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_is_retryable() {
        assert!(OpenAIBackend::is_retryable(&LlmError::Timeout));
        assert!(OpenAIBackend::is_retryable(&LlmError::Network("reset".into())));
        assert!(!OpenAIBackend::is_retryable(&LlmError::Api("401".into())));
    }

    #[tokio::test]
    async fn test_generate_returns_content_verbatim() {
        let (endpoint, calls) = mock_server(0, StatusCode::OK).await;
        let backend = OpenAIBackend::new(local_config(endpoint, 0)).unwrap();

        let result = backend.generate(&[Message::user("здравей")]).await.unwrap();
        assert_eq!(result.text, "echo: здравей");
        assert_eq!(result.tokens, 3);
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let (endpoint, calls) = mock_server(2, StatusCode::SERVICE_UNAVAILABLE).await;
        let backend = OpenAIBackend::new(local_config(endpoint, 2)).unwrap();

        let result = backend.generate(&[Message::user("q")]).await.unwrap();
        assert_eq!(result.text, "echo: q");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_when_disabled() {
        let (endpoint, calls) = mock_server(1, StatusCode::BAD_GATEWAY).await;
        let backend = OpenAIBackend::new(local_config(endpoint, 0)).unwrap();

        let err = backend.generate(&[Message::user("q")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (endpoint, calls) = mock_server(5, StatusCode::UNAUTHORIZED).await;
        let backend = OpenAIBackend::new(local_config(endpoint, 3)).unwrap();

        let err = backend.generate(&[Message::user("q")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Api(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
