//! Request and Response models for the tool-call transport
//!
//! JSON-RPC 2.0 envelopes plus the tool and resource payloads carried in
//! them.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{JsonRpcRequest, ResourceReadParams, ToolCallParams, WeatherArgs};
pub use responses::{
    HealthResponse, JsonRpcError, JsonRpcResponse, StatsResponse, ToolContent, ToolResult,
};
