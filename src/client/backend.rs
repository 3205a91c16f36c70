//! Typed backend API
//!
//! One method per backend endpoint. Every call goes through the
//! coordinator, so a stale session is refreshed transparently.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use url::Url;

use super::coordinator::RequestCoordinator;
use super::models::{AuthStatus, LogoutResponse, ProtectedData, PublicData};
use super::navigator::Navigator;
use super::paths;
use super::transport::{ApiRequest, HttpTransport, SessionCookies, Transport, endpoint_url};
use crate::error::Result;

/// URL that starts the GitHub OAuth handshake on the backend
pub fn login_url(base_url: &Url) -> Result<Url> {
    endpoint_url(base_url, paths::GITHUB_AUTHORIZATION)
}

fn decode<D: DeserializeOwned>(value: Value) -> Result<D> {
    Ok(serde_json::from_value(value)?)
}

/// Backend API for one browser session
pub struct BackendApi<T> {
    coordinator: RequestCoordinator<T>,
}

impl BackendApi<HttpTransport> {
    /// Build the API over HTTP for one browser session
    pub fn over_http(
        client: reqwest::Client,
        base_url: Url,
        cookies: Arc<SessionCookies>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let transport = HttpTransport::new(client, base_url, cookies);
        Self::new(RequestCoordinator::new(transport, navigator))
    }
}

impl<T: Transport> BackendApi<T> {
    pub fn new(coordinator: RequestCoordinator<T>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &RequestCoordinator<T> {
        &self.coordinator
    }

    /// Current authentication status
    ///
    /// Never fails: any error is logged and reported as unauthenticated.
    pub async fn check_auth_status(&self) -> AuthStatus {
        let result = self
            .coordinator
            .send(ApiRequest::get(paths::AUTH_STATUS))
            .await
            .and_then(decode::<AuthStatus>);

        match result {
            Ok(status) => status,
            Err(error) => {
                tracing::error!(%error, "Auth status check failed");
                AuthStatus::default()
            }
        }
    }

    pub async fn fetch_protected_data(&self) -> Result<ProtectedData> {
        let body = self
            .coordinator
            .send(ApiRequest::get(paths::PROTECTED_DATA))
            .await
            .inspect_err(|error| tracing::error!(%error, "Failed to fetch protected data"))?;
        decode(body)
    }

    /// Invoke a named action on the protected endpoint
    pub async fn perform_action(&self, action: &str) -> Result<Map<String, Value>> {
        let request = ApiRequest::post(paths::PROTECTED_ACTION, Some(json!({ "action": action })));
        let body = self
            .coordinator
            .send(request)
            .await
            .inspect_err(|error| tracing::error!(action, %error, "Failed to perform action"))?;
        decode(body)
    }

    pub async fn fetch_public_data(&self) -> Result<PublicData> {
        let body = self
            .coordinator
            .send(ApiRequest::get(paths::PUBLIC_HEALTH))
            .await
            .inspect_err(|error| tracing::error!(%error, "Failed to fetch public data"))?;
        decode(body)
    }

    /// End the backend session
    ///
    /// Failures are logged and swallowed; the caller always proceeds to
    /// the logged-out view.
    pub async fn logout(&self) {
        match self
            .coordinator
            .send(ApiRequest::post(paths::LOGOUT, None))
            .await
        {
            Ok(body) => {
                let message = decode::<LogoutResponse>(body)
                    .ok()
                    .and_then(|response| response.message)
                    .unwrap_or_default();
                tracing::info!(%message, "Logout successful");
            }
            Err(error) => tracing::error!(%error, "Logout failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RequestNavigator;
    use crate::client::testing::ScriptedTransport;
    use crate::error::AppError;

    fn api(transport: Arc<ScriptedTransport>, path: &str) -> BackendApi<Arc<ScriptedTransport>> {
        BackendApi::new(RequestCoordinator::new(
            transport,
            Arc::new(RequestNavigator::new(path)),
        ))
    }

    #[test]
    fn login_url_points_at_github_authorization() {
        let base = Url::parse("http://localhost:8080").unwrap();
        assert_eq!(
            login_url(&base).unwrap().as_str(),
            "http://localhost:8080/oauth2/authorization/github"
        );
    }

    #[tokio::test]
    async fn status_without_session_is_unauthenticated() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(paths::AUTH_STATUS, 200, r#"{"authenticated":false}"#);
        let api = api(transport, "/");

        assert_eq!(api.check_auth_status().await, AuthStatus::default());
    }

    #[tokio::test]
    async fn status_degrades_on_failure() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(paths::AUTH_STATUS, 500, "oops");
        transport.script(paths::AUTH_STATUS, 200, "not json");
        let api = api(transport.clone(), "/");

        assert!(!api.check_auth_status().await.authenticated);
        assert!(!api.check_auth_status().await.authenticated);
        // Nothing scripted left: behaves like a dropped connection.
        assert!(!api.check_auth_status().await.authenticated);
        assert!(transport.calls_to(paths::AUTH_REFRESH).is_empty());
    }

    #[tokio::test]
    async fn status_reports_user() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            paths::AUTH_STATUS,
            200,
            r#"{"authenticated":true,"user":{"id":7,"login":"alice","name":"Alice","avatar_url":"https://avatars.example/7"}}"#,
        );
        let api = api(transport, "/dashboard");

        let status = api.check_auth_status().await;
        assert!(status.authenticated);
        assert_eq!(status.user.unwrap().login, "alice");
    }

    #[tokio::test]
    async fn perform_action_posts_action_name() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            paths::PROTECTED_ACTION,
            200,
            r#"{"result":"done","action":"test_action"}"#,
        );
        let api = api(transport.clone(), "/dashboard");

        let result = api.perform_action("test_action").await.unwrap();
        assert_eq!(result["result"], "done");

        let calls = transport.calls_to(paths::PROTECTED_ACTION);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, Some(json!({"action": "test_action"})));
    }

    #[tokio::test]
    async fn perform_action_rejects_non_object_body() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(paths::PROTECTED_ACTION, 200, "[1,2,3]");
        let api = api(transport, "/dashboard");

        assert!(matches!(
            api.perform_action("sample_operation").await,
            Err(AppError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn public_data_decodes_string_timestamp() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            paths::PUBLIC_HEALTH,
            200,
            r#"{"status":"UP","message":"Backend is running","timestamp":"2024-05-01T10:00:00Z"}"#,
        );
        let api = api(transport, "/");

        let data = api.fetch_public_data().await.unwrap();
        assert_eq!(data.status, "UP");
        assert_eq!(data.message.as_deref(), Some("Backend is running"));
    }

    #[tokio::test]
    async fn logout_swallows_failures() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(paths::LOGOUT, 500, "down");
        let api = api(transport.clone(), "/dashboard");

        api.logout().await;
        assert_eq!(transport.calls_to(paths::LOGOUT).len(), 1);
    }

    #[tokio::test]
    async fn refresh_failure_redirects_dashboard_to_landing() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(paths::PROTECTED_DATA, 401, "");
        transport.script(paths::AUTH_REFRESH, 401, "");
        let navigator = Arc::new(RequestNavigator::new("/dashboard"));
        let api = BackendApi::new(RequestCoordinator::new(transport, navigator.clone()));

        assert!(matches!(
            api.fetch_protected_data().await,
            Err(AppError::Authentication)
        ));
        assert_eq!(navigator.take_redirect().as_deref(), Some("/"));
    }
}
