//! HTTP Endpoints
//!
//! The browser page and a JSON API over the same sessions.

use std::time::{Duration, Instant};

use axum::{
    extract::{Form, Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use textbook_chat_agent::TurnOutcome;
use textbook_chat_core::SubjectSelection;

use crate::metrics::{
    metrics_handler, record_provider_error, record_request, record_selection,
    record_turn_latency,
};
use crate::page::render_page;
use crate::session::Session;
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        // Browser page
        .route("/", get(new_chat))
        .route("/chat/:id", get(chat_page).post(submit_question))
        // JSON API
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/chat/:id", post(chat))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return layer.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

/// Run one question through a session, recording metrics
async fn ask(state: &AppState, session: &Session, question: &str) -> Option<(TurnOutcome, usize)> {
    session.touch();
    let start = Instant::now();

    let mut chat = session.chat.lock().await;
    let outcome = chat.ask(&state.pipeline, question).await?;

    record_turn_latency(start.elapsed());
    if let Some(selection) = outcome.selection {
        record_selection(selection);
    }
    if outcome.failed {
        record_provider_error();
    }

    Some((outcome, chat.transcript().exchange_count()))
}

fn lookup(state: &AppState, id: &str) -> Result<std::sync::Arc<Session>, ServerError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
}

/// GET / - start a new conversation
async fn new_chat(State(state): State<AppState>) -> Result<Redirect, StatusCode> {
    record_request("new_chat");
    let session = state.sessions.create()?;
    Ok(Redirect::to(&format!("/chat/{}", session.id)))
}

/// GET /chat/:id - the page with the transcript so far
async fn chat_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    record_request("chat_page");
    let Some(session) = state.sessions.get(&id) else {
        // Unknown or expired session: start over
        return Redirect::to("/").into_response();
    };
    session.touch();

    let chat = session.chat.lock().await;
    let page = chat
        .render()
        .map_err(ServerError::from)
        .and_then(|transcript| render_page(&id, &transcript));

    match page {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(session_id = %id, error = %e, "Page render failed");
            StatusCode::from(e).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionForm {
    #[serde(default)]
    question: String,
}

/// POST /chat/:id - submit the form, then redirect back to the page
async fn submit_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<QuestionForm>,
) -> Redirect {
    record_request("submit_question");
    let Some(session) = state.sessions.get(&id) else {
        return Redirect::to("/");
    };

    ask(&state, &session, &form.question).await;
    Redirect::to(&format!("/chat/{}", id))
}

/// POST /api/sessions
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    record_request("create_session");
    let session = state.sessions.create()?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "session_id": session.id })),
    ))
}

/// GET /api/sessions/:id
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    record_request("get_session");
    let session = lookup(&state, &id)?;
    let chat = session.chat.lock().await;

    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "created_at": chat.created_at(),
        "turn_count": chat.transcript().exchange_count(),
        "turns": chat.transcript().turns(),
    })))
}

/// DELETE /api/sessions/:id
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    record_request("delete_session");
    if state.sessions.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    selection: Option<SubjectSelection>,
    turn_count: usize,
    failed: bool,
}

/// POST /api/chat/:id
async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    record_request("chat");
    let session = lookup(&state, &id)?;

    let (outcome, turn_count) = ask(&state, &session, &request.message)
        .await
        .ok_or_else(|| ServerError::InvalidRequest("message is blank".to_string()))?;

    Ok(Json(ChatResponse {
        response: outcome.answer,
        selection: outcome.selection,
        turn_count,
        failed: outcome.failed,
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: session capacity and completion backend reachability
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut checks = serde_json::Map::new();
    let mut ready = true;

    let session_count = state.sessions.count();
    let at_capacity = session_count >= state.config.server.max_sessions;
    checks.insert(
        "sessions".to_string(),
        serde_json::json!({
            "status": if at_capacity { "full" } else { "ok" },
            "count": session_count,
            "max": state.config.server.max_sessions,
        }),
    );
    if at_capacity {
        ready = false;
    }

    if let Some(llm) = &state.llm {
        let status = match tokio::time::timeout(Duration::from_secs(2), llm.is_available()).await
        {
            Ok(true) => "ok",
            Ok(false) => {
                ready = false;
                "unreachable"
            }
            Err(_) => {
                ready = false;
                "timeout"
            }
        };
        checks.insert(
            "llm_backend".to_string(),
            serde_json::json!({
                "status": status,
                "model": llm.model_name(),
            }),
        );
    }

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": checks,
        })),
    )
}
