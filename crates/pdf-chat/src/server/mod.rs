//! HTTP server for the PDF chat

pub mod page;
pub mod routes;
pub mod state;

use axum::{http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use state::AppState;

/// PDF chat HTTP server
pub struct ChatServer {
    config: AppConfig,
    state: AppState,
}

impl ChatServer {
    /// Create a new server
    pub fn new(config: AppConfig) -> Self {
        let state = AppState::new(config.clone());
        Self { config, state }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        self.spawn_session_sweeper();

        let router = build_router(self.state.clone());

        tracing::info!("Starting PDF chat on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        self.state.set_ready(true);

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }

    fn spawn_session_sweeper(&self) {
        let state = self.state.clone();
        let period = Duration::from_secs(self.config.session.sweep_interval_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let evicted = state.sessions().evict_idle();
                if evicted > 0 {
                    tracing::debug!(
                        "Evicted {} idle sessions, {} remain",
                        evicted,
                        state.sessions().len()
                    );
                }
            }
        });
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let max_upload_size = state.config().server.max_upload_size;

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .merge(routes::ui_routes(max_upload_size))
        .nest("/api", routes::api_routes(max_upload_size))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if state.config().server.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(state: axum::extract::State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
