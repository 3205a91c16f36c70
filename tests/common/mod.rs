//! Common test utilities for E2E tests
//!
//! `FakeBackend` stands in for the OAuth/session backend; `TestServer` runs
//! the frontend against it. Both listen on ephemeral local ports.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use oauthdash::{AppState, config};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use url::Url;

/// Session cookie the fake backend accepts
pub const VALID_TOKEN: &str = "fresh-token";

/// Session cookie the fake backend rejects until it is refreshed
pub const STALE_TOKEN: &str = "stale-token";

#[derive(Default)]
struct BackendCounters {
    refresh_calls: AtomicUsize,
    data_calls: AtomicUsize,
    action_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    unauthorized: AtomicUsize,
}

#[derive(Clone)]
struct BackendState {
    counters: Arc<BackendCounters>,
    refresh_succeeds: Arc<AtomicBool>,
    reject_protected: Arc<AtomicBool>,
    fail_data: Arc<AtomicBool>,
    hold_refresh_until: Arc<AtomicUsize>,
    unauthorized_served: Arc<Notify>,
}

/// Fake OAuth/session backend
pub struct FakeBackend {
    pub addr: String,
    state: BackendState,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = BackendState {
            counters: Arc::new(BackendCounters::default()),
            refresh_succeeds: Arc::new(AtomicBool::new(true)),
            reject_protected: Arc::new(AtomicBool::new(false)),
            fail_data: Arc::new(AtomicBool::new(false)),
            hold_refresh_until: Arc::new(AtomicUsize::new(0)),
            unauthorized_served: Arc::new(Notify::new()),
        };

        let app = Router::new()
            .route("/api/auth/status", get(auth_status))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/protected/data", get(protected_data))
            .route("/api/protected/action", post(protected_action))
            .route("/api/public/health", get(public_health))
            .route("/logout", post(logout))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
        }
    }

    pub fn url(&self) -> Url {
        Url::parse(&self.addr).unwrap()
    }

    pub fn fail_refresh(&self) {
        self.state.refresh_succeeds.store(false, Ordering::SeqCst);
    }

    /// Answer 401 on protected endpoints whatever the cookie says
    pub fn reject_protected(&self) {
        self.state.reject_protected.store(true, Ordering::SeqCst);
    }

    /// Answer 500 on the protected data endpoint
    pub fn fail_data(&self) {
        self.state.fail_data.store(true, Ordering::SeqCst);
    }

    /// Hold refresh responses until this many 401s have been served
    pub fn hold_refresh_until(&self, unauthorized: usize) {
        self.state
            .hold_refresh_until
            .store(unauthorized, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.counters.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn data_calls(&self) -> usize {
        self.state.counters.data_calls.load(Ordering::SeqCst)
    }

    pub fn action_calls(&self) -> usize {
        self.state.counters.action_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.state.counters.logout_calls.load(Ordering::SeqCst)
    }
}

fn has_valid_session(jar: &CookieJar) -> bool {
    jar.get("jwt")
        .is_some_and(|cookie| cookie.value() == VALID_TOKEN)
}

fn unauthorized(state: &BackendState) -> Response {
    state.counters.unauthorized.fetch_add(1, Ordering::SeqCst);
    state.unauthorized_served.notify_waiters();
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
}

async fn auth_status(jar: CookieJar) -> Json<Value> {
    if has_valid_session(&jar) {
        Json(json!({
            "authenticated": true,
            "user": {
                "id": 583231,
                "login": "alice",
                "name": "Alice",
                "email": "alice@example.com",
                "avatar_url": "https://avatars.example.com/u/583231"
            }
        }))
    } else {
        Json(json!({"authenticated": false}))
    }
}

async fn refresh(State(state): State<BackendState>) -> Response {
    state.counters.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let hold = state.hold_refresh_until.load(Ordering::SeqCst);
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        while state.counters.unauthorized.load(Ordering::SeqCst) < hold {
            let served = state.unauthorized_served.notified();
            if state.counters.unauthorized.load(Ordering::SeqCst) >= hold {
                break;
            }
            served.await;
        }
    })
    .await;
    if hold > 0 {
        // Let the client finish reading the 401s it was sent.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    if !state.refresh_succeeds.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "refresh expired"}))).into_response();
    }

    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            format!("jwt={}; Path=/; HttpOnly", VALID_TOKEN),
        )],
        Json(json!({"message": "refreshed"})),
    )
        .into_response()
}

async fn protected_data(State(state): State<BackendState>, jar: CookieJar) -> Response {
    state.counters.data_calls.fetch_add(1, Ordering::SeqCst);

    if state.reject_protected.load(Ordering::SeqCst) || !has_valid_session(&jar) {
        return unauthorized(&state);
    }
    if state.fail_data.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "data unavailable"})),
        )
            .into_response();
    }

    Json(json!({
        "message": "ok",
        "user": "alice",
        "data": {"items": ["a"], "lastUpdated": 1_700_000_000_000_i64}
    }))
    .into_response()
}

async fn protected_action(
    State(state): State<BackendState>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> Response {
    state.counters.action_calls.fetch_add(1, Ordering::SeqCst);

    if state.reject_protected.load(Ordering::SeqCst) || !has_valid_session(&jar) {
        return unauthorized(&state);
    }

    let action = body["action"].as_str().unwrap_or_default().to_string();
    if action == "explode" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "action failed"})),
        )
            .into_response();
    }

    Json(json!({"result": "done", "action": action})).into_response()
}

async fn public_health() -> Json<Value> {
    Json(json!({
        "status": "UP",
        "message": "Backend is running",
        "timestamp": 1_700_000_000_000_i64
    }))
}

async fn logout(State(state): State<BackendState>) -> Response {
    state.counters.logout_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, "jwt=; Path=/; Max-Age=0")],
        Json(json!({"message": "Logged out successfully"})),
    )
        .into_response()
}

/// Frontend server running against a fake backend
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub backend: FakeBackend,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let backend = FakeBackend::start().await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                protocol: "http".to_string(),
            },
            backend: config::BackendConfig {
                base_url: backend.addr.clone(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).unwrap();

        // Pages answer with redirects the tests want to inspect.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = oauthdash::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
            backend,
            client,
        }
    }

    /// Get URL for a frontend path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

/// `Location` header of a redirect response
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_string()
}

/// All `Set-Cookie` headers of a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok().map(ToString::to_string))
        .collect()
}
