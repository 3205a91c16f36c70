//! OAuth error page

use axum::extract::Query;
use axum::response::Html;
use serde::Deserialize;

use super::render;

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    error: Option<String>,
}

/// Readable message for an error code the backend put in the redirect
pub fn error_message(code: Option<&str>) -> &'static str {
    match code {
        Some("auth_failed") => "Authentication failed. Please try again.",
        Some("access_denied") => {
            "Access was denied. You need to authorize the application to continue."
        }
        Some("server_error") => "A server error occurred. Please try again later.",
        _ => "An unexpected error occurred during authentication.",
    }
}

/// GET /error?error=<code>
pub async fn show(Query(query): Query<ErrorQuery>) -> Html<String> {
    let code = query.error.as_deref().filter(|code| !code.is_empty());
    Html(render::error_page(error_message(code), code))
}
