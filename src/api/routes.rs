//! API Routes
//!
//! Configures the Axum router with the tool-call and operational endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, mcp_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /mcp` - JSON-RPC tool-call transport
/// - `GET /stats` - Cache and rate gate statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: allows any origin so browser-based clients can connect
/// - Tracing: logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
