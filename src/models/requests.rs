//! Request DTOs for the tool-call transport
//!
//! Defines the structure of incoming JSON-RPC messages and their params.

use serde::Deserialize;
use serde_json::Value;

/// A JSON-RPC 2.0 request or notification.
///
/// Notifications carry no `id` and get no response body.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Returns an error message if the envelope is not JSON-RPC 2.0.
    pub fn validate(&self) -> Option<String> {
        if self.jsonrpc != "2.0" {
            return Some(format!("unsupported jsonrpc version '{}'", self.jsonrpc));
        }
        if self.method.is_empty() {
            return Some("method cannot be empty".to_string());
        }
        None
    }
}

/// Params of `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Arguments of the `get_weather_by_region` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherArgs {
    /// Region name, e.g. "서울" or "부산 해운대"
    pub region: String,
    /// "text" (default) or "json"
    #[serde(default)]
    pub format: Option<String>,
}

impl WeatherArgs {
    pub fn wants_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
    }
}

/// Params of `resources/read`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceReadParams {
    pub uri: String,
}
