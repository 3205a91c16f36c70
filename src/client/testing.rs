//! In-memory transport for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use tokio::sync::Notify;

use super::paths;
use super::transport::{ApiRequest, RawResponse, Transport};
use crate::error::{AppError, Result};

/// Transport answering from per-endpoint scripts
///
/// Refresh calls can be held until the test opens the gate, which is how
/// tests park requests behind an in-flight refresh. A request with nothing
/// scripted fails like a dropped connection would.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    calls: Mutex<Vec<ApiRequest>>,
    refresh_gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            refresh_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn script(&self, path: &str, status: u16, body: &str) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(RawResponse::new(
                StatusCode::from_u16(status).unwrap(),
                body,
            ));
    }

    /// Every request seen, in the order it reached the transport
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.path == path)
            .cloned()
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(request.clone());

        if request.path == paths::AUTH_REFRESH {
            if let Some(gate) = &self.refresh_gate {
                gate.notified().await;
            }
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front);
        next.ok_or_else(|| {
            AppError::InvalidResponse(format!("no scripted response for {}", request.path))
        })
    }
}
