//! OAuthDash - GitHub OAuth dashboard frontend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Pages (Axum)                             │
//! │  - Landing, dashboard, error views                          │
//! │  - Route guard middleware                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Backend client                           │
//! │  - Typed endpoint calls                                     │
//! │  - Request coordinator (single-flight session refresh)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │              External OAuth / session backend                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `pages`: HTML views and page handlers
//! - `auth`: Route guard and authentication context
//! - `client`: Backend transport, request coordinator, typed API
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus registry and `/metrics` export

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pages;

use std::sync::Arc;

use url::Url;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Backend origin
    pub backend_url: Url,

    /// HTTP client for backend calls
    pub http_client: Arc<reqwest::Client>,

    /// Route guard for protected pages
    pub guard: Arc<auth::RouteGuard>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the backend URL is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let backend_url = config.backend.url()?;

        // No request timeout: the backend's own limits apply.
        let http_client = reqwest::Client::builder()
            .user_agent("OAuthDash/0.1.0")
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let http_client = Arc::new(http_client);

        let guard = auth::RouteGuard::new(http_client.clone(), backend_url.clone());

        tracing::info!(backend = %backend_url, "Application state initialized");

        Ok(Self {
            config: Arc::new(config),
            backend_url,
            http_client,
            guard: Arc::new(guard),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(pages::pages_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::route_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .route("/metrics", axum::routing::get(metrics_export))
}

/// GET /metrics
///
/// Prometheus text format. Routed after the guard layer, so it is never
/// redirected.
async fn metrics_export() -> Result<impl axum::response::IntoResponse, error::AppError> {
    let body = metrics::encode()?;
    Ok((
        [(axum::http::header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    ))
}

async fn health_check() -> &'static str {
    "OK"
}
