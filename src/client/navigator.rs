//! Navigation seam
//!
//! The coordinator never renders anything itself. When a session turns out
//! to be unrecoverable it asks the navigator to move the user back to the
//! landing view.

use std::sync::{Mutex, PoisonError};

/// Where the user currently is, and how to send them elsewhere
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Path of the view currently shown
    fn current_path(&self) -> String;

    /// Move to another view
    fn redirect_to(&self, path: &str);
}

/// Navigator for a single incoming page request
///
/// The current view is the request path. A redirect is only recorded here;
/// the page handler turns it into an HTTP redirect once rendering is done.
#[derive(Debug)]
pub struct RequestNavigator {
    current: String,
    redirect: Mutex<Option<String>>,
}

impl RequestNavigator {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            redirect: Mutex::new(None),
        }
    }

    /// Take the recorded redirect, if any
    pub fn take_redirect(&self) -> Option<String> {
        self.redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Navigator for RequestNavigator {
    fn current_path(&self) -> String {
        self.current.clone()
    }

    fn redirect_to(&self, path: &str) {
        tracing::debug!(from = %self.current, to = %path, "Navigation requested");
        *self.redirect.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.to_string());
    }
}
