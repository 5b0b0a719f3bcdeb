//! Naver Weather MCP - a weather tool-call server
//!
//! Scrapes current conditions from Naver search behind a TTL cache and a
//! process-wide rate gate, and serves them over a JSON-RPC HTTP transport.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod tasks;
pub mod weather;

pub use api::AppState;
pub use config::Config;
pub use gate::{FetchGate, RateGate};
pub use tasks::spawn_cleanup_task;
