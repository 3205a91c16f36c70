//! HTML rendering
//!
//! Plain markup only; every value that came from the backend or the
//! browser is escaped before it is written.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::client::models::{ProtectedData, PublicData, User};

/// Banner shown above the page content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Actions offered on the dashboard: (action name, button label)
pub const DASHBOARD_ACTIONS: &[(&str, &str)] = &[
    ("refresh_data", "Refresh Data"),
    ("test_action", "Test Action"),
    ("sample_operation", "Sample Operation"),
];

/// Protected actions a signed-out visitor can try from the landing page
pub const LANDING_ACTIONS: &[(&str, &str)] = &[
    ("test_action", "Test Action"),
    ("sample_operation", "Sample Operation"),
];

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title} - OAuthDash</title>
</head>
<body>
{body}
</body>
</html>
"#,
        title = encode_text(title),
        body = body,
    )
}

fn notice_html(notice: Option<&Notice>) -> String {
    match notice {
        Some(Notice::Success(message)) => {
            format!(r#"<div class="notice success">{}</div>"#, encode_text(message))
        }
        Some(Notice::Error(message)) => {
            format!(r#"<div class="notice error">{}</div>"#, encode_text(message))
        }
        None => String::new(),
    }
}

fn action_button(target: &str, action: &str, label: &str) -> String {
    format!(
        r#"<form method="post" action="{target}"><input type="hidden" name="action" value="{action}"><button type="submit">{label}</button></form>"#,
        target = encode_double_quoted_attribute(target),
        action = encode_double_quoted_attribute(action),
        label = encode_text(label),
    )
}

pub fn landing(public: Option<&PublicData>, notice: Option<&Notice>) -> String {
    let health = match public {
        Some(data) => format!(
            r#"<dl class="health">
  <dt>Status</dt><dd>{status}</dd>
  <dt>Message</dt><dd>{message}</dd>
  <dt>Timestamp</dt><dd>{timestamp}</dd>
</dl>"#,
            status = encode_text(&data.status),
            message = encode_text(data.message.as_deref().unwrap_or("")),
            timestamp = encode_text(&data.timestamp.display()),
        ),
        None => r#"<p class="health">Backend status unavailable</p>"#.to_string(),
    };

    let buttons: String = LANDING_ACTIONS
        .iter()
        .map(|(action, label)| action_button("/action", action, label))
        .collect();

    let body = format!(
        r#"<h1>GitHub OAuth Demo</h1>
{notice}
<p>Sign in with your GitHub account to reach the dashboard.</p>
<a class="login" href="/login">Sign in with GitHub</a>
<h2>Public API</h2>
{health}
<h2>Protected API</h2>
<p>Try a protected action without signing in.</p>
{buttons}
"#,
        notice = notice_html(notice),
        health = health,
        buttons = buttons,
    );

    layout("Home", &body)
}

pub fn dashboard(user: &User, data: Option<&ProtectedData>, error: Option<&str>) -> String {
    let banner = error
        .map(|message| notice_html(Some(&Notice::Error(message.to_string()))))
        .unwrap_or_default();

    let avatar = if user.avatar_url.is_empty() {
        String::new()
    } else {
        format!(
            r#"<img class="avatar" src="{}" alt="{}">"#,
            encode_double_quoted_attribute(&user.avatar_url),
            encode_double_quoted_attribute(user.display_name()),
        )
    };

    let email = user
        .email
        .as_deref()
        .map(|email| format!("<dt>Email</dt><dd>{}</dd>", encode_text(email)))
        .unwrap_or_default();

    let protected = match data {
        Some(data) => {
            let payload = data.data.clone().unwrap_or_default();
            let items: String = payload
                .items
                .iter()
                .map(|item| format!("<li>{}</li>", encode_text(item)))
                .collect();
            let last_updated = payload
                .last_updated
                .map(|timestamp| timestamp.display())
                .unwrap_or_else(|| "N/A".to_string());

            format!(
                r#"<dl class="protected">
  <dt>Message</dt><dd>{message}</dd>
  <dt>Items</dt><dd><ul>{items}</ul></dd>
  <dt>Last Updated</dt><dd>{last_updated}</dd>
</dl>"#,
                message = encode_text(&data.message),
                items = items,
                last_updated = encode_text(&last_updated),
            )
        }
        None => "<p>Protected data not available</p>".to_string(),
    };

    let buttons: String = DASHBOARD_ACTIONS
        .iter()
        .map(|(action, label)| action_button("/dashboard/action", action, label))
        .collect();

    let body = format!(
        r#"<header>
  <h1>Dashboard</h1>
  {avatar}
  <span class="user">{name} @{login}</span>
  <form method="post" action="/logout"><button type="submit">Logout</button></form>
</header>
{banner}
<h2>User Information</h2>
<dl class="user-info">
  <dt>Name</dt><dd>{name_or_missing}</dd>
  <dt>Username</dt><dd>@{login}</dd>
  <dt>User ID</dt><dd>{id}</dd>
  {email}
</dl>
<h2>Protected Data</h2>
{protected}
<h2>Actions</h2>
{buttons}
"#,
        avatar = avatar,
        name = encode_text(user.display_name()),
        login = encode_text(&user.login),
        banner = banner,
        name_or_missing = encode_text(user.name.as_deref().unwrap_or("Not provided")),
        id = user.id,
        email = email,
        protected = protected,
        buttons = buttons,
    );

    layout("Dashboard", &body)
}

pub fn error_page(message: &str, code: Option<&str>) -> String {
    let code = code
        .map(|code| format!(r#"<p class="code">Error code: {}</p>"#, encode_text(code)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Authentication Error</h1>
<p>There was a problem with the authentication process</p>
<div class="notice error">{message}</div>
<a href="/">Try Again</a>
<a href="/">Back to Home</a>
{code}
"#,
        message = encode_text(message),
        code = code,
    );

    layout("Error", &body)
}
