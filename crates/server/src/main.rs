//! Textbook Chat Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use textbook_chat_agent::{QaPipeline, QaPipelineConfig};
use textbook_chat_config::{constants::env as env_vars, load_settings, Settings};
use textbook_chat_llm::{LlmBackend, OpenAIBackend, OpenAIConfig, StuffDocumentsAdapter};
use textbook_chat_rag::{build_embedder, connect_indexes};
use textbook_chat_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env first so the plain variables are visible to the config layer
    dotenv::dotenv().ok();

    // Priority: env vars > config/{env}.toml > config/default.toml > defaults
    let env = std::env::var(env_vars::ENVIRONMENT).ok();
    // Missing files fall back to defaults inside the loader; a file that
    // fails to parse or validate stops startup.
    let config = load_settings(env.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    // Tracing not yet initialized
    eprintln!(
        "Loaded configuration (env: {})",
        env.as_deref().unwrap_or("default")
    );

    init_tracing(&config);

    tracing::info!("Starting Textbook Chat Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        backend = ?config.index.backend,
        innovations_index = %config.index.innovations.name,
        economics_index = %config.index.economics.name,
        "Configuration loaded"
    );

    config.require_credentials()?;

    // Provider clients are built once and shared by every session
    let embedder = Arc::new(build_embedder(&config)?);
    let indexes = connect_indexes(&config).await?;
    let llm: Arc<dyn LlmBackend> = Arc::new(OpenAIBackend::new(OpenAIConfig::from_settings(
        &config,
    ))?);
    let completion = StuffDocumentsAdapter::from_arc(llm.clone())
        .with_system_template(config.prompts.retrieval_qa_system.clone());
    tracing::info!(
        embedding_model = %config.embedding.model,
        chat_model = %config.llm.model,
        "Providers initialized"
    );

    let pipeline = QaPipeline::new(
        embedder,
        indexes,
        Arc::new(completion),
        QaPipelineConfig::from_settings(&config),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let metrics_enabled = config.observability.metrics_enabled;

    let mut state = AppState::new(config, pipeline).with_llm(llm);
    if metrics_enabled {
        if let Some(handle) = init_metrics() {
            state = state.with_metrics(handle);
            tracing::info!("Initialized Prometheus metrics at /metrics");
        }
    }

    let cleanup_shutdown = state.sessions.start_cleanup_task();
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup_shutdown.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// `RUST_LOG` overrides `observability.log_level`
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("textbook_chat={level},tower_http=debug").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
