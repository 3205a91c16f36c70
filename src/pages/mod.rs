//! Pages
//!
//! Server-rendered views:
//! - `/` landing page with the GitHub sign-in link
//! - `/dashboard` protected dashboard
//! - `/error` OAuth error page
//!
//! Each request opens a [`BrowserSession`]: the browser's cookies, one
//! coordinator and one navigator. All backend calls made while rendering the
//! page share that session, and cookies the backend refreshed along the way
//! are written back to the browser.

mod dashboard;
mod error;
mod landing;
mod render;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use serde::Deserialize;

use crate::AppState;
use crate::client::{
    BackendApi, HttpTransport, LANDING_PATH, RequestNavigator, SESSION_COOKIE, SessionCookies,
    login_url,
};
use crate::error::AppError;

pub use error::error_message;

/// The protected dashboard view
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Create pages router
///
/// Routes:
/// - GET / - Landing page
/// - POST /action - Try a protected action from the landing page
/// - GET /login - Redirect to the backend OAuth handshake
/// - GET /error - OAuth error page
/// - GET /dashboard - Dashboard
/// - POST /dashboard/action - Run an action from the dashboard
/// - POST /logout - Logout
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing::show))
        .route("/action", post(landing::try_action))
        .route("/login", get(login))
        .route("/error", get(error::show))
        .route(DASHBOARD_PATH, get(dashboard::show))
        .route("/dashboard/action", post(dashboard::act))
        .route("/logout", post(logout))
}

/// Form body of the action buttons
#[derive(Debug, Deserialize)]
pub struct ActionForm {
    pub action: String,
}

/// Backend access on behalf of one browser request
pub(crate) struct BrowserSession {
    api: BackendApi<HttpTransport>,
    navigator: Arc<RequestNavigator>,
    cookies: Arc<SessionCookies>,
    initial: BTreeMap<String, String>,
    secure_cookies: bool,
}

impl BrowserSession {
    /// Open a session for a request rendering the view at `path`
    pub(crate) fn open(state: &AppState, path: &str, jar: &CookieJar) -> Self {
        let cookies = Arc::new(SessionCookies::new());
        for cookie in jar.iter() {
            cookies.set(cookie.name(), cookie.value());
        }
        let initial = cookies.snapshot();

        let navigator = Arc::new(RequestNavigator::new(path));
        let api = BackendApi::over_http(
            (*state.http_client).clone(),
            state.backend_url.clone(),
            cookies.clone(),
            navigator.clone(),
        );

        Self {
            api,
            navigator,
            cookies,
            initial,
            secure_cookies: state.config.should_use_secure_cookies(),
        }
    }

    pub(crate) fn api(&self) -> &BackendApi<HttpTransport> {
        &self.api
    }

    /// Complete the response
    ///
    /// A redirect requested by the coordinator replaces the rendered page.
    /// Cookies changed by the backend are forwarded either way.
    pub(crate) fn finish(self, jar: CookieJar, page: Response) -> Response {
        let jar = self.forward_cookie_updates(jar);

        match self.navigator.take_redirect() {
            Some(to) => (jar, Redirect::to(&to)).into_response(),
            None => (jar, page).into_response(),
        }
    }

    fn forward_cookie_updates(&self, mut jar: CookieJar) -> CookieJar {
        let current = self.cookies.snapshot();

        for (name, value) in &current {
            if self.initial.get(name) != Some(value) {
                tracing::debug!(cookie = %name, "Forwarding refreshed cookie to browser");
                jar = jar.add(
                    Cookie::build((name.clone(), value.clone()))
                        .path("/")
                        .http_only(true)
                        .secure(self.secure_cookies),
                );
            }
        }

        for name in self.initial.keys() {
            if !current.contains_key(name) {
                jar = jar.remove(Cookie::build((name.clone(), String::new())).path("/"));
            }
        }

        jar
    }
}

// =============================================================================
// Login / Logout
// =============================================================================

/// GET /login
///
/// Sends the browser to the backend, which runs the GitHub OAuth handshake.
async fn login(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let url = login_url(&state.backend_url)?;
    Ok(Redirect::to(url.as_str()))
}

/// POST /logout
///
/// Ends the backend session, clears the session cookie and returns to the
/// landing page whatever the backend said.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = BrowserSession::open(&state, "/logout", &jar);
    session.api().logout().await;

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
    (jar, Redirect::to(LANDING_PATH)).into_response()
}
