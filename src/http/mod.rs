//! HTTP surface: routes, handlers and error rendering.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::AppContainer;
use crate::error::ShortclipResult;

pub mod error;
pub mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub container: Arc<dyn AppContainer>,
}

impl AppState {
    pub fn new(container: Arc<dyn AppContainer>) -> Self {
        Self { container }
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/generate-clip", post(handlers::generate_clip))
        .route("/clips", get(handlers::list_clips))
        .route("/clips/:session_id", delete(handlers::delete_session))
        .route("/clips/:session_id/:file", get(handlers::download_clip))
        .route("/static/:root/*path", get(handlers::serve_static))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> ShortclipResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
