//! HTTP server for document conversion: multipart PDF uploads and webpage
//! URLs in, markdown plus storage references out.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

pub mod error;
pub mod handlers;
pub mod models;
pub mod state;
pub mod template;
pub mod upload;

pub use state::AppState;

/// Upload cap for PDF files (50 MB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router. The tier path segment is parsed per
/// request; unknown tiers are client errors.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index::index))
        .route(
            "/api/v1/{tier}/process-pdf",
            post(handlers::process::process_pdf),
        )
        .route(
            "/api/v1/{tier}/process-webpage",
            post(handlers::process::process_webpage),
        )
        .route("/api/v1/{tier}/health", get(handlers::health::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
