//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::AppError;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Backend Metrics
    pub static ref BACKEND_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauthdash_backend_requests_total", "Total number of requests sent to the backend"),
        &["method", "path", "status"]
    ).expect("metric can be created");
    pub static ref BACKEND_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "oauthdash_backend_request_duration_seconds",
            "Backend request duration in seconds"
        ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path"]
    ).expect("metric can be created");

    // Session Metrics
    pub static ref SESSION_REFRESHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauthdash_session_refreshes_total", "Total number of session refresh calls"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref QUEUED_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauthdash_queued_requests_total", "Requests parked behind an in-flight session refresh"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref GUARD_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauthdash_guard_decisions_total", "Route guard decisions"),
        &["decision"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauthdash_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(BACKEND_REQUESTS_TOTAL.clone()))
        .expect("BACKEND_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(BACKEND_REQUEST_DURATION_SECONDS.clone()))
        .expect("BACKEND_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(SESSION_REFRESHES_TOTAL.clone()))
        .expect("SESSION_REFRESHES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(QUEUED_REQUESTS_TOTAL.clone()))
        .expect("QUEUED_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GUARD_DECISIONS_TOTAL.clone()))
        .expect("GUARD_DECISIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Registry contents in Prometheus text format
pub fn encode() -> Result<String, AppError> {
    TextEncoder::new()
        .encode_to_string(&REGISTRY.gather())
        .map_err(|e| AppError::Internal(e.into()))
}
