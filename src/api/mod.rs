//! API Module
//!
//! HTTP tool-call transport for the weather server.
//!
//! # Endpoints
//! - `POST /mcp` - JSON-RPC 2.0 tool-call messages
//! - `GET /stats` - Cache and rate gate statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
