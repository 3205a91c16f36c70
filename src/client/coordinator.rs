//! Authenticated request coordinator
//!
//! Every backend call goes through [`RequestCoordinator::send`]. A 401 is
//! recovered locally by refreshing the session once and replaying the
//! request; concurrent 401s share that single refresh.
//!
//! # Refresh protocol
//!
//! ```text
//! send ──► 401 ──► retried? ──yes──► Authentication
//!                     │no
//!                     ▼
//!               refreshing? ──yes──► queue (FIFO) ──► settle ──► replay / Authentication
//!                     │no
//!                     ▼
//!          POST /api/auth/refresh ──► settle queue ──► replay / redirect + Authentication
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::StatusCode;
use serde_json::Value;
use tokio::sync::oneshot;

use super::navigator::Navigator;
use super::paths;
use super::transport::{ApiRequest, RawResponse, Transport};
use crate::error::{AppError, Result};
use crate::metrics::{QUEUED_REQUESTS_TOTAL, SESSION_REFRESHES_TOTAL};

/// The public landing view
pub const LANDING_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    Failed,
}

impl RefreshOutcome {
    fn label(self) -> &'static str {
        match self {
            RefreshOutcome::Refreshed => "refreshed",
            RefreshOutcome::Failed => "failed",
        }
    }
}

/// Refresh flag plus the requests parked behind it
#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Wraps a transport with single-flight session refresh
pub struct RequestCoordinator<T> {
    transport: T,
    navigator: Arc<dyn Navigator>,
    state: Mutex<RefreshState>,
}

impl<T> RequestCoordinator<T> {
    /// Create new coordinator
    ///
    /// # Arguments
    /// * `transport` - Carries requests (and credentials) to the backend
    /// * `navigator` - Receives the landing redirect when the session is lost
    pub fn new(transport: T, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            transport,
            navigator,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Whether a refresh call is outstanding
    pub fn is_refreshing(&self) -> bool {
        self.lock_state().refreshing
    }

    /// Number of requests waiting on the outstanding refresh
    pub fn pending_len(&self) -> usize {
        self.lock_state().pending.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the refresh flag and release every queued request, oldest first
    fn settle(&self, outcome: RefreshOutcome) {
        let pending = {
            let mut state = self.lock_state();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        let queued = pending.len();
        for waiter in pending {
            // A waiter whose caller went away has nothing left to release.
            let _ = waiter.send(outcome);
        }

        tracing::debug!(queued, outcome = outcome.label(), "Session refresh settled");
    }

    fn redirect_to_landing(&self) {
        if self.navigator.current_path() != LANDING_PATH {
            tracing::warn!("Unauthorized access - redirecting to login");
            self.navigator.redirect_to(LANDING_PATH);
        }
    }
}

/// Settles the refresh as failed if the owning future is dropped before
/// the refresh call completes, so queued requests never wait forever.
struct InFlightRefresh<'a, T> {
    coordinator: &'a RequestCoordinator<T>,
    settled: bool,
}

impl<T> InFlightRefresh<'_, T> {
    fn finish(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl<T> Drop for InFlightRefresh<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Session refresh abandoned before completion");
            self.coordinator.settle(RefreshOutcome::Failed);
        }
    }
}

impl<T: Transport> RequestCoordinator<T> {
    /// Send a request with session credentials attached
    ///
    /// # Returns
    /// The decoded JSON body of a 2xx/3xx response
    ///
    /// # Errors
    /// - `Authentication` if the session could not be refreshed, or the
    ///   request was rejected again after its replay
    /// - `Backend`, `HttpClient`, `InvalidResponse` for every other failure;
    ///   these are never retried
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        let mut request = request;

        loop {
            let response = match self.transport.execute(&request).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::error!(
                        method = %request.method,
                        path = %request.path,
                        %error,
                        "Backend request failed"
                    );
                    return Err(error);
                }
            };

            if response.status != StatusCode::UNAUTHORIZED {
                return accept(&request, response);
            }

            if request.retried {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    "Still unauthorized after session refresh"
                );
                return Err(AppError::Authentication);
            }

            request.retried = true;
            self.await_refresh(&request.path).await?;

            tracing::debug!(
                method = %request.method,
                path = %request.path,
                "Replaying request after session refresh"
            );
        }
    }

    /// Join the outstanding refresh, or start one
    async fn await_refresh(&self, path: &str) -> Result<()> {
        let waiter = {
            let mut state = self.lock_state();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.pending.push_back(tx);
                Some(rx)
            } else {
                state.refreshing = true;
                None
            }
        };

        if let Some(rx) = waiter {
            tracing::debug!(path, "Session refresh in flight; queueing request");
            let outcome = rx.await.unwrap_or(RefreshOutcome::Failed);
            QUEUED_REQUESTS_TOTAL
                .with_label_values(&[outcome.label()])
                .inc();

            return match outcome {
                RefreshOutcome::Refreshed => Ok(()),
                RefreshOutcome::Failed => Err(AppError::Authentication),
            };
        }

        let in_flight = InFlightRefresh {
            coordinator: self,
            settled: false,
        };
        let outcome = self.refresh_session().await;
        in_flight.finish(outcome);

        match outcome {
            RefreshOutcome::Refreshed => Ok(()),
            RefreshOutcome::Failed => {
                self.redirect_to_landing();
                Err(AppError::Authentication)
            }
        }
    }

    async fn refresh_session(&self) -> RefreshOutcome {
        tracing::info!("Refreshing session");

        let request = ApiRequest::post(paths::AUTH_REFRESH, None);
        let outcome = match self.transport.execute(&request).await {
            Ok(response) if response.status.is_success() => RefreshOutcome::Refreshed,
            Ok(response) => {
                tracing::warn!(
                    status = response.status.as_u16(),
                    body = %response.body,
                    "Session refresh rejected"
                );
                RefreshOutcome::Failed
            }
            Err(error) => {
                tracing::warn!(%error, "Session refresh failed");
                RefreshOutcome::Failed
            }
        };

        SESSION_REFRESHES_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        outcome
    }
}

fn accept(request: &ApiRequest, response: RawResponse) -> Result<Value> {
    if response.status.is_success() || response.status.is_redirection() {
        return response.json().inspect_err(|error| {
            tracing::error!(path = %request.path, %error, "Malformed backend response");
        });
    }

    tracing::error!(
        status = response.status.as_u16(),
        path = %request.path,
        body = %response.body,
        "API error"
    );
    Err(AppError::Backend {
        status: response.status,
        path: request.path.clone(),
        body: response.body,
    })
}
