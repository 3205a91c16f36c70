//! Session awareness for the frontend
//!
//! Handles:
//! - Authentication context for page rendering
//! - Route guard middleware for protected pages

mod context;
mod middleware;

pub use context::{AuthContext, AuthSnapshot};
pub use middleware::{GuardDecision, RouteAccess, RouteGuard, route_guard};
