//! Landing page

use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::render::{self, Notice};
use super::{ActionForm, BrowserSession, DASHBOARD_PATH};
use crate::AppState;
use crate::auth::AuthContext;
use crate::client::LANDING_PATH;

/// GET /
///
/// Signed-in users go straight to the dashboard; everyone else sees the
/// sign-in link and the backend's public health.
pub async fn show(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = BrowserSession::open(&state, LANDING_PATH, &jar);
    let context = AuthContext::new();

    let ((), public) = tokio::join!(
        context.refresh(session.api()),
        session.api().fetch_public_data()
    );

    if context.snapshot().await.authenticated {
        return session.finish(jar, Redirect::to(DASHBOARD_PATH).into_response());
    }

    let page = render::landing(public.ok().as_ref(), None);
    session.finish(jar, Html(page).into_response())
}

/// POST /action
///
/// Lets a visitor poke the protected endpoint and see the outcome.
pub async fn try_action(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ActionForm>,
) -> Response {
    let session = BrowserSession::open(&state, LANDING_PATH, &jar);

    let (result, public) = tokio::join!(
        session.api().perform_action(&form.action),
        session.api().fetch_public_data()
    );

    let notice = match result {
        Ok(_) => Notice::Success(format!(
            "Action '{}' completed successfully",
            form.action
        )),
        Err(_) => Notice::Error(
            "Authentication required. You must be logged in to perform this action".to_string(),
        ),
    };

    let page = render::landing(public.ok().as_ref(), Some(&notice));
    session.finish(jar, Html(page).into_response())
}
