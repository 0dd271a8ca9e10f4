#![allow(dead_code)]

use axum_test::{TestResponse, TestServer};
use request_shield::config::Config;
use request_shield::domain::clock::{Clock, ManualClock};
use request_shield::domain::probe::DatabaseProbe;
use request_shield::domain::stores::{CounterStore, SessionStore};
use request_shield::infrastructure::store::{MemoryCounterStore, MemorySessionStore};
use request_shield::routes::defended_router;
use request_shield::server::build_state;
use request_shield::state::AppState;
use serde_json::Value;
use std::sync::Arc;

pub const WINDOW_MS: u64 = 60_000;

/// Config with small limits; the client address is taken from `X-Forwarded-For`.
pub fn test_config() -> Config {
    Config {
        redis_url: None,
        database_url: None,
        listen_addr: "127.0.0.1:0".to_string(),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
        behind_proxy: true,
        rate_limit_window_ms: WINDOW_MS,
        rate_limit_max: 100,
        contact_rate_limit_max: 5,
        store_timeout_ms: 200,
        session_cookie: "sid".to_string(),
        session_ttl_seconds: 3600,
        csrf_header: "x-csrf-token".to_string(),
        max_body_bytes: 1024 * 1024,
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub clock: Arc<ManualClock>,
}

pub struct Backends {
    pub counters: Arc<dyn CounterStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub database: Option<Arc<dyn DatabaseProbe>>,
}

impl Backends {
    pub fn in_memory(clock: Arc<ManualClock>) -> Self {
        Self {
            counters: Arc::new(MemoryCounterStore::new(clock.clone())),
            sessions: Arc::new(MemorySessionStore::new(clock, 3600)),
            database: None,
        }
    }
}

pub fn create_test_state(config: &Config, backends: Backends, clock: Arc<dyn Clock>) -> AppState {
    build_state(
        config,
        backends.counters,
        backends.sessions,
        backends.database,
        clock,
    )
    .unwrap()
}

pub fn spawn_app(config: Config) -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let backends = Backends::in_memory(clock.clone());
    spawn_app_with(config, backends, clock)
}

pub fn spawn_app_with(config: Config, backends: Backends, clock: Arc<ManualClock>) -> TestApp {
    let state = create_test_state(&config, backends, clock.clone());
    let server = TestServer::new(defended_router(state)).unwrap();
    TestApp { server, clock }
}

/// `name=value` pair from the response's `Set-Cookie`, ready for a `Cookie` header.
pub fn session_cookie(response: &TestResponse) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Opens a session and fetches its CSRF token. Returns `(cookie, token)`.
pub async fn fetch_token(app: &TestApp, ip: &str) -> (String, String) {
    let response = app
        .server
        .get("/api/csrf-token")
        .add_header("x-forwarded-for", ip)
        .await;
    response.assert_status_ok();

    let cookie = session_cookie(&response).unwrap();
    let token = response.json::<Value>()["csrfToken"]
        .as_str()
        .unwrap()
        .to_string();

    (cookie, token)
}
