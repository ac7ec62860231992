//! End-to-end tests for POST/GET/OPTIONS on /api/generate.
//! The webhook is a wiremock server, so no external services are required.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use gateway::{router, AppState};
use relay_core::config::WEBHOOK_URL_KEY;
use relay_core::{RelayConfig, ToolKind};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_with_webhook(url: Option<String>) -> Router {
    let config = RelayConfig {
        webhook_url: url,
        backoff_step: Duration::from_millis(5),
        ..RelayConfig::default()
    };
    router(AppState::from_config(&config).expect("state"))
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .header("origin", "https://app.example")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn assert_cors_headers(response: &axum::response::Response) {
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "POST, OPTIONS, GET"
    );
    assert_eq!(headers.get("access-control-allow-headers").unwrap(), "Content-Type");
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn missing_webhook_url_fails_without_network() {
    let app = app_with_webhook(None);

    let response = app
        .oneshot(post("/api/generate", r#"{"tool":"press"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors_headers(&response);
    let body = json_body(response).await;
    assert_eq!(body["error"], format!("{WEBHOOK_URL_KEY} is not set"));
    assert!(body.get("hint").is_none());
}

#[tokio::test]
async fn echo_mode_returns_raw_text_without_forwarding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = app_with_webhook(Some(server.uri()));

    let response = app
        .oneshot(post("/api/generate?echo=1", "not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "ok": true, "payload": "not json" }));
}

#[tokio::test]
async fn echo_mode_returns_normalized_records() {
    let server = MockServer::start().await;
    let app = app_with_webhook(Some(server.uri()));

    let response = app
        .oneshot(post(
            "/api/generate?echo=1",
            r#"[{"tool":"social","organization":"OV","socialData":{"platforms":["twitter","linkedin"],"topic":"t"}}]"#,
        ))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(
        body["payload"],
        json!([{
            "tool": "social",
            "organization": "OV",
            "platforms": ["twitter", "linkedin"],
            "topic": "t",
            "content": "",
            "include_organization": false,
            "organization_unit": ""
        }])
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn forwards_normalized_payload_and_relays_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    let app = app_with_webhook(Some(server.uri()));

    let response = app
        .oneshot(post(
            "/api/generate",
            r#"{"tool":"motion","motionData":{"idea":"i","includeResearch":1}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors_headers(&response);
    assert_eq!(json_body(response).await, json!({ "result": "ok" }));

    let received = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        sent,
        json!([{
            "tool": "motion",
            "organization": "",
            "idea": "i",
            "details": "",
            "include_research": true
        }])
    );
}

#[tokio::test]
async fn non_json_body_is_forwarded_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_string("accepted"))
        .expect(1)
        .mount(&server)
        .await;
    let app = app_with_webhook(Some(server.uri()));

    let response = app.oneshot(post("/api/generate", "plain words")).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await, json!({ "result": "accepted" }));
    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body, b"plain words");
}

#[tokio::test]
async fn exhausted_queue_is_relayed_as_400() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "result": "Queue is full." })))
        .expect(3)
        .mount(&server)
        .await;
    let app = app_with_webhook(Some(server.uri()));

    let response = app
        .oneshot(post("/api/generate", r#"{"tool":"speech","speechData":{"duration":["15"]}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "result": "Queue is full (retries exceeded)." })
    );
}

#[tokio::test]
async fn unreachable_webhook_is_a_500_with_hint() {
    // Nothing listens on port 1, so the connection is refused.
    let app = app_with_webhook(Some("http://127.0.0.1:1".to_string()));

    let response = app.oneshot(post("/api/generate", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(body["hint"].as_str().is_some());
}

#[tokio::test]
async fn get_is_a_healthcheck() {
    let app = app_with_webhook(None);

    let response = app
        .oneshot(Request::get("/api/generate").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "ok": true, "route": "/api/generate" }));
}

#[tokio::test]
async fn preflight_returns_empty_object_with_cors_headers() {
    let app = app_with_webhook(None);

    let response = app
        .oneshot(
            Request::options("/api/generate")
                .header("origin", "https://app.example")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors_headers(&response);
    assert_eq!(json_body(response).await, json!({}));
}

#[tokio::test]
async fn repeated_echo_parameter_uses_first_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = app_with_webhook(Some(server.uri()));

    let response = app
        .oneshot(post("/api/generate?echo=1&echo=0", "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["payload"][0]["tool"], "generic");
}

#[tokio::test]
async fn other_echo_values_forward_normally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    let app = app_with_webhook(Some(server.uri()));

    let response = app
        .oneshot(post("/api/generate?echo=0&echo=1", "{}"))
        .await
        .unwrap();

    assert_eq!(json_body(response).await, json!({ "result": "ok" }));
}

#[tokio::test]
async fn oversized_body_is_a_500_without_forwarding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let config = RelayConfig {
        webhook_url: Some(server.uri()),
        max_body_bytes: 8,
        ..RelayConfig::default()
    };
    let app = router(AppState::from_config(&config).unwrap());

    let response = app
        .oneshot(post("/api/generate", r#"{"tool":"press","pressData":{}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors_headers(&response);
    let body = json_body(response).await;
    assert!(body["error"].as_str().is_some_and(|e| e.contains("request body")));
    assert!(body["hint"].as_str().is_some());
}

#[tokio::test]
async fn legacy_default_tool_policy_applies_to_untagged_submissions() {
    let server = MockServer::start().await;
    let config = RelayConfig {
        webhook_url: Some(server.uri()),
        policy: relay_core::NormalizePolicy { default_tool: ToolKind::Press },
        ..RelayConfig::default()
    };
    let app = router(AppState::from_config(&config).unwrap());

    let response = app
        .oneshot(post("/api/generate?echo=1", r#"{"pressData":{"topic":"Radweg"}}"#))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["payload"][0]["tool"], "press");
    assert_eq!(body["payload"][0]["topic"], "Radweg");
    assert_eq!(body["payload"][0]["quote3_function"], "");
}
