//! Gate Module
//!
//! Throttling of outbound fetches and the orchestrator that composes the
//! throttle with the TTL cache.

mod fetch_gate;
mod rate_gate;

pub use fetch_gate::FetchGate;
pub use rate_gate::{GateStats, RateGate};
