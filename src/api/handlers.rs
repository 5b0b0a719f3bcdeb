//! API Handlers
//!
//! HTTP handlers for the tool-call endpoint and the operational endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ApiError, FetchError, Result};
use crate::gate::FetchGate;
use crate::models::{
    HealthResponse, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ResourceReadParams,
    StatsResponse, ToolCallParams, ToolResult, WeatherArgs,
};
use crate::weather::{NaverWeatherClient, WeatherReport, WeatherSource, REPORT_FIELDS};

pub const SERVER_NAME: &str = "Naver Weather MCP (Scraping, HTTP)";
pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const WEATHER_TOOL: &str = "get_weather_by_region";
pub const FIELDS_RESOURCE: &str = "naver://weather/fields";

/// Longest failure reason echoed back to the caller.
const MAX_REASON_CHARS: usize = 120;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cached, rate-gated access to weather reports
    pub weather: FetchGate<WeatherReport>,
    /// Underlying fetch used on cache misses
    pub source: Arc<dyn WeatherSource>,
}

impl AppState {
    pub fn new(weather: FetchGate<WeatherReport>, source: Arc<dyn WeatherSource>) -> Self {
        Self { weather, source }
    }

    /// Builds the cache, the rate gate and the Naver client from
    /// configuration. The client shares the gate for its retries.
    pub fn from_config(config: &Config) -> std::result::Result<Self, FetchError> {
        let weather = FetchGate::from_config(config);
        let client = NaverWeatherClient::new(config, Arc::clone(weather.gate()))?;
        Ok(Self::new(weather, Arc::new(client)))
    }
}

/// Handler for POST /mcp
///
/// Accepts one JSON-RPC 2.0 message. Notifications are acknowledged with
/// 202 and no body; batches are rejected.
pub async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            let error = JsonRpcError::parse_error(format!("invalid JSON: {err}"));
            return Ok(Json(JsonRpcResponse::failure(Value::Null, error)).into_response());
        }
    };

    if message.is_array() {
        return Err(ApiError::InvalidRequest(
            "batch requests are not supported".to_string(),
        ));
    }

    let id = message.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(err) => {
            let error = JsonRpcError::invalid_request(err.to_string());
            return Ok(Json(JsonRpcResponse::failure(id, error)).into_response());
        }
    };
    if let Some(reason) = request.validate() {
        let error = JsonRpcError::invalid_request(reason);
        return Ok(Json(JsonRpcResponse::failure(id, error)).into_response());
    }

    if request.is_notification() {
        info!(method = %request.method, "notification received");
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    let response = match dispatch(&state, &request).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error),
    };
    Ok(Json(response).into_response())
}

async fn dispatch(
    state: &AppState,
    request: &JsonRpcRequest,
) -> std::result::Result<Value, JsonRpcError> {
    match request.method.as_str() {
        "initialize" => Ok(initialize_result(request.params.as_ref())),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": [weather_tool_descriptor()] })),
        "tools/call" => {
            let params: ToolCallParams = parse_params(request.params.as_ref())?;
            if params.name != WEATHER_TOOL {
                return Err(JsonRpcError::invalid_params(format!(
                    "unknown tool: {}",
                    params.name
                )));
            }
            let args: WeatherArgs = parse_params(params.arguments.as_ref())?;
            let result = run_weather_tool(state, args).await;
            serde_json::to_value(result)
                .map_err(|e| JsonRpcError::internal(format!("failed to encode result: {e}")))
        }
        "resources/list" => Ok(json!({
            "resources": [{
                "uri": FIELDS_RESOURCE,
                "name": "supported_fields",
                "description": "이 MCP가 반환 가능한 필드 목록을 제공합니다.",
                "mimeType": "application/json",
            }]
        })),
        "resources/read" => {
            let params: ResourceReadParams = parse_params(request.params.as_ref())?;
            if params.uri != FIELDS_RESOURCE {
                return Err(JsonRpcError::invalid_params(format!(
                    "unknown resource: {}",
                    params.uri
                )));
            }
            Ok(json!({
                "contents": [{
                    "uri": FIELDS_RESOURCE,
                    "mimeType": "application/json",
                    "text": supported_fields(state).to_string(),
                }]
            }))
        }
        other => Err(JsonRpcError::method_not_found(other)),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<&Value>,
) -> std::result::Result<T, JsonRpcError> {
    let params = params.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn initialize_result(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": {}, "resources": {} },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}

fn weather_tool_descriptor() -> Value {
    json!({
        "name": WEATHER_TOOL,
        "description": "지역명을 받아 네이버 검색 결과(날씨 모듈)에서 현재 상태/기온 등을 조회합니다. format='text'|'json'",
        "inputSchema": {
            "type": "object",
            "properties": {
                "region": { "type": "string", "description": "조회할 지역명 (예: '서울', '부산 해운대', 'Jeju')" },
                "format": { "type": "string", "enum": ["text", "json"], "default": "text" },
            },
            "required": ["region"],
        },
    })
}

/// Contents of the fields resource.
pub fn supported_fields(state: &AppState) -> Value {
    json!({
        "fields": REPORT_FIELDS,
        "cache_ttl_seconds": state.weather.cache().ttl().as_secs(),
        "rate_limit_seconds": state.weather.gate().interval().as_secs_f64(),
    })
}

/// Runs `get_weather_by_region`.
///
/// Failures become an error tool result with a shortened reason rather than
/// a protocol error.
pub async fn run_weather_tool(state: &AppState, args: WeatherArgs) -> ToolResult {
    let region = args.region.trim();
    if region.is_empty() {
        return ToolResult::error("지역명이 비어 있습니다. 예: region='서울'");
    }

    let source = Arc::clone(&state.source);
    let report = match state
        .weather
        .fetch(region, move |key| source.fetch(key))
        .await
    {
        Ok(report) => report,
        Err(err) => {
            warn!(region, error = %err, "weather fetch/parse failed");
            let reason: String = err
                .fetch_error()
                .to_string()
                .chars()
                .take(MAX_REASON_CHARS)
                .collect();
            return ToolResult::error(format!(
                "[오류] 날씨 정보를 가져오는 중 문제가 발생했습니다. 잠시 후 다시 시도해 주세요. (reason: {reason})"
            ));
        }
    };

    if args.wants_json() {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => ToolResult::text(json),
            Err(err) => ToolResult::error(format!("failed to encode report: {err}")),
        }
    } else {
        ToolResult::text(report.to_text())
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.weather.cache();
    Json(StatsResponse::new(
        cache.stats(),
        cache.loads_in_flight(),
        state.weather.gate().stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
