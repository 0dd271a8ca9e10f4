mod common;

use axum::{
    Json, Router,
    extract::{Path, RawQuery},
    http::StatusCode,
    middleware,
    routing::get,
};
use axum_test::TestServer;
use common::{Backends, create_test_state, fetch_token, spawn_app, test_config};
use request_shield::api::middleware::defense;
use request_shield::domain::clock::ManualClock;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::Layer;

/// Defense layer alone (no session layer) around an echo route.
fn echo_server(max_body_bytes: usize) -> TestServer {
    let mut config = test_config();
    config.max_body_bytes = max_body_bytes;
    let clock = Arc::new(ManualClock::default());
    let state = create_test_state(&config, Backends::in_memory(clock.clone()), clock);

    let router = Router::new().route(
        "/echo/{value}",
        get(|Path(value): Path<String>, RawQuery(query): RawQuery| async move {
            Json(json!({ "value": value, "query": query }))
        })
        .post(|| async { StatusCode::NO_CONTENT }),
    );

    let defended = middleware::from_fn_with_state(state, defense::layer).layer(router);
    TestServer::new(Router::new().fallback_service(defended)).unwrap()
}

#[tokio::test]
async fn test_path_segment_is_escaped_before_routing() {
    let server = echo_server(1024);

    let response = server.get("/echo/%3Cb%3Ehi%3C%2Fb%3E").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["value"], "&lt;b&gt;hi&lt;/b&gt;");
}

#[tokio::test]
async fn test_script_block_removed_from_query() {
    let server = echo_server(1024);

    let response = server
        .get("/echo/x?q=%3Cscript%3Ealert(1)%3C%2Fscript%3Eok&page=2")
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["query"], "q=ok&page=2");
}

#[tokio::test]
async fn test_clean_query_is_forwarded_verbatim() {
    let server = echo_server(1024);

    let response = server.get("/echo/x?a=%20b&c=d").await;

    assert_eq!(response.json::<Value>()["query"], "a=%20b&c=d");
}

#[tokio::test]
async fn test_missing_session_on_post_is_server_error() {
    let server = echo_server(1024);

    let response = server.post("/echo/x").json(&json!({})).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = echo_server(64);

    let response = server
        .post("/echo/x")
        .json(&json!({ "message": "a".repeat(200) }))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.json::<Value>()["statusCode"], 413);
}

#[tokio::test]
async fn test_json_body_reaches_handler_sanitized() {
    let app = spawn_app(test_config());
    let (cookie, token) = fetch_token(&app, "198.51.100.1").await;

    let response = app
        .server
        .post("/api/contact")
        .add_header("cookie", cookie.as_str())
        .add_header("x-csrf-token", token.as_str())
        .json(&json!({
            "name": "<b>Ada</b>",
            "email": "ada@example.com",
            "message": "<script>steal()</script>Hi & <i>bye</i>"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["name"], "&lt;b&gt;Ada&lt;/b&gt;");
    assert_eq!(body["message"], "Hi & &lt;i&gt;bye&lt;/i&gt;");
}

#[tokio::test]
async fn test_escaped_input_is_not_escaped_again() {
    let app = spawn_app(test_config());
    let (cookie, token) = fetch_token(&app, "198.51.100.1").await;

    let response = app
        .server
        .post("/api/contact")
        .add_header("cookie", cookie.as_str())
        .add_header("x-csrf-token", token.as_str())
        .json(&json!({
            "name": "Ada",
            "email": "ada@example.com",
            "message": "&lt;b&gt;already&lt;/b&gt;"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(
        response.json::<Value>()["message"],
        "&lt;b&gt;already&lt;/b&gt;"
    );
}
