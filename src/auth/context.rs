//! Authentication context
//!
//! What the pages know about the signed-in user.

use tokio::sync::RwLock;

use crate::client::models::User;
use crate::client::{BackendApi, Transport};

/// Snapshot of the authentication state
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub authenticated: bool,
    /// True until the first status check completes
    pub loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            authenticated: false,
            loading: true,
        }
    }
}

/// Authentication state shared by everything rendering one page
#[derive(Debug, Default)]
pub struct AuthContext {
    state: RwLock<AuthSnapshot>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.state.read().await.clone()
    }

    /// Reload the state from the backend status endpoint
    pub async fn refresh<T: Transport>(&self, api: &BackendApi<T>) {
        let status = api.check_auth_status().await;

        let mut state = self.state.write().await;
        state.authenticated = status.authenticated;
        state.user = if status.authenticated {
            status.user
        } else {
            None
        };
        state.loading = false;
    }
}
