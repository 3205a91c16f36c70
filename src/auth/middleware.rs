//! Route guard middleware
//!
//! Protects the dashboard: on every navigation the `jwt` cookie is
//! forwarded to the backend status endpoint, and only an explicit
//! `authenticated: true` lets the request through.

use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::Value;
use url::Url;

use crate::AppState;
use crate::client::{
    ApiRequest, HttpTransport, LANDING_PATH, SESSION_COOKIE, SessionCookies, Transport, paths,
};
use crate::metrics::GUARD_DECISIONS_TOTAL;

/// Routes that never require authentication
pub const PUBLIC_ROUTES: &[&str] = &["/", "/error"];

/// Route prefixes that require an authenticated session
pub const PROTECTED_PREFIXES: &[&str] = &["/dashboard"];

const ASSET_PREFIXES: &[&str] = &["/_next/", "/static/"];

const ASSET_EXTENSIONS: &[&str] = &[
    "html",
    "htm",
    "css",
    "js",
    "jpg",
    "jpeg",
    "webp",
    "png",
    "gif",
    "svg",
    "ttf",
    "woff",
    "woff2",
    "ico",
    "csv",
    "doc",
    "docx",
    "xls",
    "xlsx",
    "zip",
    "webmanifest",
];

/// How a path is treated by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Always accessible
    Public,
    /// Needs an authenticated session
    Protected,
    /// Static files; the guard does not run
    Asset,
    /// Anything else passes through
    Open,
}

impl RouteAccess {
    pub fn of(path: &str) -> Self {
        if is_asset(path) {
            return RouteAccess::Asset;
        }
        if PUBLIC_ROUTES.contains(&path) {
            return RouteAccess::Public;
        }
        if PROTECTED_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            RouteAccess::Protected
        } else {
            RouteAccess::Open
        }
    }
}

fn is_asset(path: &str) -> bool {
    // API routes always go through the guard, even with a file-like suffix.
    if path.starts_with("/api/") {
        return false;
    }
    if ASSET_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return true;
    }

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    last_segment.rsplit_once('.').is_some_and(|(_, extension)| {
        ASSET_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
    })
}

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

impl GuardDecision {
    fn label(&self) -> &'static str {
        match self {
            GuardDecision::Allow => "allow",
            GuardDecision::Redirect(_) => "redirect",
        }
    }
}

/// Checks session cookies against the backend
#[derive(Debug, Clone)]
pub struct RouteGuard {
    http_client: Arc<reqwest::Client>,
    base_url: Url,
}

impl RouteGuard {
    pub fn new(http_client: Arc<reqwest::Client>, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// Decide whether a navigation to `path` may proceed
    ///
    /// # Arguments
    /// * `path` - Requested path
    /// * `session_token` - Value of the `jwt` cookie, if the browser sent one
    pub async fn decide(&self, path: &str, session_token: Option<&str>) -> GuardDecision {
        match RouteAccess::of(path) {
            RouteAccess::Public | RouteAccess::Asset | RouteAccess::Open => GuardDecision::Allow,
            RouteAccess::Protected => {
                if self.is_authenticated(session_token).await {
                    GuardDecision::Allow
                } else {
                    GuardDecision::Redirect(LANDING_PATH)
                }
            }
        }
    }

    /// Ask the backend whether the session cookie is still valid
    ///
    /// Any failure counts as unauthenticated. No refresh is attempted here.
    pub async fn is_authenticated(&self, session_token: Option<&str>) -> bool {
        let Some(token) = session_token.filter(|token| !token.is_empty()) else {
            return false;
        };

        let transport = HttpTransport::new(
            (*self.http_client).clone(),
            self.base_url.clone(),
            Arc::new(SessionCookies::with_cookie(SESSION_COOKIE, token)),
        );

        match transport.execute(&ApiRequest::get(paths::AUTH_STATUS)).await {
            Ok(response) if response.status.is_success() => response
                .json()
                .ok()
                .and_then(|body| body.get("authenticated").and_then(Value::as_bool))
                .unwrap_or(false),
            Ok(response) => {
                tracing::debug!(
                    status = response.status.as_u16(),
                    "Backend rejected session cookie"
                );
                false
            }
            Err(error) => {
                tracing::error!(%error, "Auth check failed in middleware");
                false
            }
        }
    }
}

/// Middleware that redirects unauthenticated dashboard navigations
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/dashboard", ...)
///     .layer(middleware::from_fn_with_state(state, route_guard));
/// ```
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());

    let decision = state.guard.decide(&path, token.as_deref()).await;
    GUARD_DECISIONS_TOTAL
        .with_label_values(&[decision.label()])
        .inc();

    match decision {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(to) => {
            tracing::info!(%path, to, "Unauthenticated navigation redirected");
            Redirect::to(to).into_response()
        }
    }
}
