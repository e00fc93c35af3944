//! Application State
//!
//! Shared state across all handlers. Provider clients are built once at
//! startup and shared through `Arc`s.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use textbook_chat_agent::QaPipeline;
use textbook_chat_config::Settings;
use textbook_chat_llm::LlmBackend;

use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    pub pipeline: Arc<QaPipeline>,
    /// Completion backend probed by the readiness check
    pub llm: Option<Arc<dyn LlmBackend>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, pipeline: QaPipeline) -> Self {
        let sessions = SessionManager::with_config(
            config.server.max_sessions,
            Duration::from_secs(config.server.session_timeout_seconds),
            Duration::from_secs(config.server.cleanup_interval_seconds),
        );
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            pipeline: Arc::new(pipeline),
            llm: None,
            metrics: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmBackend>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
