//! Backend for the browser map: hands out the API key and serves the static client.

use crate::config::toml_config::ServerConfig;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub api_key: Option<String>,
    pub public_dir: PathBuf,
}

impl ServerState {
    pub fn new(api_key: Option<String>, server: &ServerConfig) -> Self {
        Self {
            api_key,
            public_dir: PathBuf::from(&server.public_dir),
        }
    }
}

async fn api_key_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match &state.api_key {
        Some(key) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            key.clone(),
        ),
        None => {
            tracing::warn!("⚠️ /api-key requested but no API key is configured");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                "API key not configured".to_string(),
            )
        }
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    let static_files = ServeDir::new(&state.public_dir);

    Router::new()
        .route("/api-key", get(api_key_handler))
        .route("/health", get(|| async { "ok" }))
        .fallback_service(static_files)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

pub async fn serve(listener: tokio::net::TcpListener, state: Arc<ServerState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
