//! Integration Tests for the tool-call transport
//!
//! Drives the full router with JSON-RPC requests against a stub weather
//! source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use futures::future::{BoxFuture, FutureExt};
use naver_weather_mcp::{
    api::create_router,
    cache::TtlCache,
    error::FetchError,
    weather::{WeatherReport, WeatherSource},
    AppState, FetchGate, RateGate,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

#[derive(Default)]
struct StubSource {
    calls: AtomicUsize,
}

impl WeatherSource for StubSource {
    fn fetch(&self, region: String) -> BoxFuture<'static, Result<WeatherReport, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if region == "unreachable" {
                return Err(FetchError::Status(503));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(WeatherReport {
                region: region.clone(),
                status: Some("흐림".to_string()),
                temperature: Some("18°C".to_string()),
                sensible_temperature: Some("17°".to_string()),
                humidity: Some("70%".to_string()),
                source: format!("stub://{region}"),
                timestamp: 1_700_000_000,
            })
        }
        .boxed()
    }
}

fn create_test_app() -> (Router, Arc<StubSource>) {
    let source = Arc::new(StubSource::default());
    let weather = FetchGate::new(
        TtlCache::new(Duration::from_secs(600), Some(16)),
        Arc::new(RateGate::new(Duration::ZERO)),
    );
    let app = create_router(AppState::new(weather, source.clone()));
    (app, source)
}

async fn post_mcp(app: &Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn call_weather(id: u64, region: &str, format: Option<&str>) -> Value {
    let mut arguments = json!({ "region": region });
    if let Some(format) = format {
        arguments["format"] = json!(format);
    }
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": "get_weather_by_region", "arguments": arguments },
    })
}

// == Protocol Tests ==

#[tokio::test]
async fn test_initialize_echoes_protocol_version() {
    let (app, _) = create_test_app();

    let (status, json) = post_mcp(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "2024-11-05", "capabilities": {} },
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 1);
    assert_eq!(json["result"]["protocolVersion"], "2024-11-05");
    assert!(json["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_tools_list_describes_weather_tool() {
    let (app, _) = create_test_app();

    let (_, json) = post_mcp(&app, json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"})).await;

    let tools = json["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "get_weather_by_region");
    assert_eq!(tools[0]["inputSchema"]["required"][0], "region");
}

#[tokio::test]
async fn test_unknown_method() {
    let (app, _) = create_test_app();

    let (status, json) = post_mcp(&app, json!({"jsonrpc": "2.0", "id": 7, "method": "prompts/list"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"]["code"], -32601);
    assert_eq!(json["id"], 7);
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["error"]["code"], -32700);
    assert!(json["id"].is_null());
}

#[tokio::test]
async fn test_batch_is_rejected() {
    let (app, _) = create_test_app();

    let (status, json) = post_mcp(&app, json!([{"jsonrpc": "2.0", "id": 1, "method": "ping"}])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("batch"));
}

#[tokio::test]
async fn test_unknown_tool_is_invalid_params() {
    let (app, _) = create_test_app();

    let (_, json) = post_mcp(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "get_forecast", "arguments": {} },
        }),
    )
    .await;

    assert_eq!(json["error"]["code"], -32602);
}

#[tokio::test]
async fn test_missing_region_is_invalid_params() {
    let (app, source) = create_test_app();

    let (_, json) = post_mcp(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "get_weather_by_region", "arguments": { "format": "json" } },
        }),
    )
    .await;

    assert_eq!(json["error"]["code"], -32602);
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

// == Tool Tests ==

#[tokio::test]
async fn test_weather_tool_text_output() {
    let (app, _) = create_test_app();

    let (status, json) = post_mcp(&app, call_weather(1, "서울", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["isError"], false);
    let text = json["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("[네이버 날씨] 서울"));
    assert!(text.contains("- 기온: 18°C"));
    assert!(text.contains("- 습도: 70%"));
}

#[tokio::test]
async fn test_weather_tool_json_output() {
    let (app, _) = create_test_app();

    let (_, json) = post_mcp(&app, call_weather(1, "제주", Some("json"))).await;

    let text = json["result"]["content"][0]["text"].as_str().unwrap();
    let report: Value = serde_json::from_str(text).unwrap();
    assert_eq!(report["region"], "제주");
    assert_eq!(report["humidity"], "70%");
    assert_eq!(report["timestamp"], 1_700_000_000);
}

#[tokio::test]
async fn test_repeated_calls_are_served_from_cache() {
    let (app, source) = create_test_app();

    for id in 0..3 {
        let (_, json) = post_mcp(&app, call_weather(id, "부산", None)).await;
        assert_eq!(json["result"]["isError"], false);
    }

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let stats: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["cache"]["hits"], 2);
    assert_eq!(stats["cache"]["loads"], 1);
    assert_eq!(stats["rate_gate"]["grants"], 1);
}

#[tokio::test]
async fn test_concurrent_tool_calls_share_one_fetch() {
    let (app, source) = create_test_app();

    let calls = (0..6).map(|id| {
        let app = app.clone();
        async move { post_mcp(&app, call_weather(id, "대구", None)).await }
    });
    let results = futures::future::join_all(calls).await;

    for (status, json) in results {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"]["isError"], false);
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upstream_failure_is_tool_error_and_not_cached() {
    let (app, source) = create_test_app();

    for id in 0..2 {
        let (status, json) = post_mcp(&app, call_weather(id, "unreachable", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"]["isError"], true);
        let text = json["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("upstream returned HTTP 503"));
    }

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fields_resource() {
    let (app, _) = create_test_app();

    let (_, listed) = post_mcp(&app, json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"})).await;
    assert_eq!(listed["result"]["resources"][0]["uri"], "naver://weather/fields");

    let (_, read) = post_mcp(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "resources/read",
            "params": { "uri": "naver://weather/fields" },
        }),
    )
    .await;
    let text = read["result"]["contents"][0]["text"].as_str().unwrap();
    let fields: Value = serde_json::from_str(text).unwrap();
    assert_eq!(fields["cache_ttl_seconds"], 600);
    assert!(fields["fields"]
        .as_array()
        .unwrap()
        .contains(&json!("sensible_temperature")));
}

// == Operational Endpoints ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
}
