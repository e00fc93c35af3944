//! Textbook Chat Server
//!
//! Serves the chat page and a small JSON API over the question answering
//! pipeline.

pub mod http;
pub mod metrics;
pub mod page;
pub mod session;
pub mod state;

pub use http::create_router;
pub use metrics::{
    init_metrics, record_provider_error, record_request, record_selection, record_turn_latency,
};
pub use session::{Session, SessionManager};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session limit reached ({0})")]
    SessionLimit(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::SessionNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::SessionLimit(_) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Render(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<textbook_chat_core::Error> for ServerError {
    fn from(err: textbook_chat_core::Error) -> Self {
        match err {
            textbook_chat_core::Error::Render(msg) => ServerError::Render(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}
