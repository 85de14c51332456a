use crate::config::Config;
use crate::streaming::{self, TaskRegistry};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use lazyhls_av::{FfmpegEncoder, FfprobeProber, ToolRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod error;
pub mod routes_api;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub registry: Arc<TaskRegistry>,
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    /// Build a context wired to the real ffprobe/ffmpeg binaries.
    pub fn new(config: Config) -> Self {
        let tools = ToolRegistry::discover(&config.tools);
        let timeout = config.transcode.timeout();

        let prober = FfprobeProber::new(tools.path_or_name("ffprobe")).with_timeout(timeout);
        let encoder = FfmpegEncoder::new(tools.path_or_name("ffmpeg"), config.transcode.clone());
        let registry = TaskRegistry::new(
            config.cache.dir.clone(),
            Arc::new(prober),
            Arc::new(encoder),
        );

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            tools: Arc::new(tools),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes_api::api_routes())
        .nest("/hls", streaming::hls_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Plain-text liveness check; `/api/health` carries the JSON status.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    tokio::fs::create_dir_all(&config.cache.dir)
        .await
        .with_context(|| format!("Failed to create cache directory: {:?}", config.cache.dir))?;

    let ctx = AppContext::new(config);
    for name in ["ffmpeg", "ffprobe"] {
        if let Err(e) = ctx.tools.require(name) {
            tracing::warn!("{}", e);
        }
    }

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
