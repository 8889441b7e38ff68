//! HTTP surface for Mnemo.
//!
//! - `GET /health`
//! - `POST /api/chat`
//! - `POST /api/search`
//! - `GET /api/sessions/{id}/summaries`

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use axum::routing::{get, post};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Build the router with every route wired to `state`.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/chat", post(routes::chat))
        .route("/api/search", post(routes::search))
        .route("/api/sessions/{id}/summaries", get(routes::summaries))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("mnemo server listening (addr={})", listener.local_addr()?);
    axum::serve(listener, router).await
}
