//! Backend transport
//!
//! The only thing the coordinator needs from the network: send a request,
//! get back a status and a body. Session credentials ride along as cookies
//! held by the transport, so callers never pass them explicitly.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use axum_extra::extract::cookie::Cookie;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use serde_json::Value;
use url::Url;

use crate::error::AppError;
use crate::metrics::{BACKEND_REQUEST_DURATION_SECONDS, BACKEND_REQUESTS_TOTAL};

/// A request to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Set once the request has been replayed after a session refresh
    pub retried: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body,
            retried: false,
        }
    }
}

/// Status and raw body of a backend response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<Value, AppError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&self.body)
            .map_err(|e| AppError::InvalidResponse(format!("body is not JSON: {}", e)))
    }
}

/// Sends requests to the backend
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, AppError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, AppError>> + Send {
        (**self).execute(request)
    }
}

/// Cookies of one browser session
///
/// Seeded from the browser's request and updated from every `Set-Cookie`
/// the backend sends, so a refreshed session cookie is used by the
/// requests replayed after the refresh.
#[derive(Debug, Default)]
pub struct SessionCookies {
    jar: RwLock<BTreeMap<String, String>>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(name: impl Into<String>, value: impl Into<String>) -> Self {
        let cookies = Self::new();
        cookies.set(name, value);
        cookies
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.jar
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `Cookie` header for the current jar, if it holds anything
    pub fn header_value(&self) -> Option<HeaderValue> {
        let jar = self.jar.read().unwrap_or_else(PoisonError::into_inner);
        if jar.is_empty() {
            return None;
        }

        let joined = jar
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }

    /// Apply the `Set-Cookie` headers of a backend response
    pub fn absorb(&self, headers: &HeaderMap) {
        let mut jar = self.jar.write().unwrap_or_else(PoisonError::into_inner);

        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            let Ok(cookie) = Cookie::parse(raw) else {
                tracing::debug!(set_cookie = %raw, "Ignoring unparseable Set-Cookie");
                continue;
            };

            let expired = cookie.value().is_empty()
                || cookie.max_age().is_some_and(|max_age| max_age.is_zero());
            if expired {
                jar.remove(cookie.name());
            } else {
                jar.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    cookies: Arc<SessionCookies>,
}

impl HttpTransport {
    /// Create a transport for one browser session
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - Backend origin
    /// * `cookies` - Session cookies sent with every request
    pub fn new(client: reqwest::Client, base_url: Url, cookies: Arc<SessionCookies>) -> Self {
        Self {
            client,
            base_url,
            cookies,
        }
    }

    /// Absolute URL for a backend path
    pub fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        endpoint_url(&self.base_url, path)
    }
}

/// Join a backend path onto the configured origin, keeping any path prefix
/// the origin carries.
pub(crate) fn endpoint_url(base_url: &Url, path: &str) -> Result<Url, AppError> {
    let joined = format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| AppError::Config(format!("invalid backend URL {}: {}", joined, e)))
}

/// Status label for calls that never produced an HTTP response
pub(crate) const TRANSPORT_ERROR_LABEL: &str = "error";

fn record_backend_call(request: &ApiRequest, status: &str, started: Instant) {
    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[request.method.as_str(), &request.path, status])
        .inc();
    BACKEND_REQUEST_DURATION_SECONDS
        .with_label_values(&[request.method.as_str(), &request.path])
        .observe(started.elapsed().as_secs_f64());
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, AppError> {
        let url = self.endpoint(&request.path)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(cookie) = self.cookies.header_value() {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let received = async {
            let response = builder.send().await?;
            let status = response.status();
            self.cookies.absorb(response.headers());
            Ok::<_, reqwest::Error>((status, response.text().await?))
        }
        .await;

        let status_label = match &received {
            Ok((status, _)) => status.as_str().to_string(),
            Err(_) => TRANSPORT_ERROR_LABEL.to_string(),
        };
        record_backend_call(request, &status_label, started);

        let (status, body) = received?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            retried = request.retried,
            "Backend responded"
        );

        Ok(RawResponse { status, body })
    }
}
