//! Backend client
//!
//! Handles:
//! - Sending requests to the backend with the session cookies attached
//! - Coordinating a single session refresh across concurrent requests
//! - Navigation side effects when the session cannot be recovered
//! - Typed access to the backend endpoints

mod backend;
mod coordinator;
pub mod models;
mod navigator;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendApi, login_url};
pub use coordinator::{LANDING_PATH, RequestCoordinator};
pub use navigator::{Navigator, RequestNavigator};
pub use transport::{ApiRequest, HttpTransport, RawResponse, SessionCookies, Transport};

#[cfg(test)]
pub use navigator::MockNavigator;

/// Backend endpoint paths
pub mod paths {
    pub const AUTH_STATUS: &str = "/api/auth/status";
    pub const AUTH_REFRESH: &str = "/api/auth/refresh";
    pub const PROTECTED_DATA: &str = "/api/protected/data";
    pub const PROTECTED_ACTION: &str = "/api/protected/action";
    pub const PUBLIC_HEALTH: &str = "/api/public/health";
    pub const LOGOUT: &str = "/logout";
    pub const GITHUB_AUTHORIZATION: &str = "/oauth2/authorization/github";
}

/// Name of the session cookie issued by the backend
pub const SESSION_COOKIE: &str = "jwt";
