//! Dashboard page

use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::render;
use super::{ActionForm, BrowserSession, DASHBOARD_PATH};
use crate::AppState;
use crate::auth::{AuthContext, AuthSnapshot};
use crate::client::models::User;
use crate::client::{BackendApi, LANDING_PATH, Transport};

const LOAD_FAILED: &str = "Failed to load dashboard data";

/// Signed-in user, or `None` when the visitor must go back to the landing page
async fn signed_in_user<T: Transport>(api: &BackendApi<T>) -> Option<User> {
    let context = AuthContext::new();
    context.refresh(api).await;

    match context.snapshot().await {
        AuthSnapshot {
            authenticated: true,
            user: Some(user),
            ..
        } => Some(user),
        _ => None,
    }
}

/// GET /dashboard
pub async fn show(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = BrowserSession::open(&state, DASHBOARD_PATH, &jar);

    let Some(user) = signed_in_user(session.api()).await else {
        return session.finish(jar, Redirect::to(LANDING_PATH).into_response());
    };

    let page = match session.api().fetch_protected_data().await {
        Ok(data) => render::dashboard(&user, Some(&data), None),
        Err(error) => {
            tracing::error!(%error, "Dashboard error");
            render::dashboard(&user, None, Some(LOAD_FAILED))
        }
    };

    session.finish(jar, Html(page).into_response())
}

/// POST /dashboard/action
///
/// Runs the action, then reloads the protected data for display.
pub async fn act(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ActionForm>,
) -> Response {
    let session = BrowserSession::open(&state, DASHBOARD_PATH, &jar);

    let Some(user) = signed_in_user(session.api()).await else {
        return session.finish(jar, Redirect::to(LANDING_PATH).into_response());
    };

    let action = session.api().perform_action(&form.action).await;
    if let Ok(result) = &action {
        tracing::info!(action = %form.action, ?result, "Action result");
    }

    // A failed reload is reported as a failed action.
    let data = session.api().fetch_protected_data().await;
    let error = (action.is_err() || data.is_err())
        .then(|| format!("Failed to perform action: {}", form.action));

    let page = render::dashboard(&user, data.as_ref().ok(), error.as_deref());
    session.finish(jar, Html(page).into_response())
}
