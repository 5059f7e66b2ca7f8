//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth Metrics
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tokengate_login_attempts_total", "Total number of login attempts"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref SESSION_DECODE_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tokengate_session_decode_failures_total", "Total number of rejected session tokens"),
        &["reason"]
    ).expect("metric can be created");
    pub static ref CREDENTIALS_TOTAL: IntGauge = IntGauge::new(
        "tokengate_credentials_total",
        "Number of stored credentials seen at startup"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tokengate_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGIN_ATTEMPTS_TOTAL.clone()))
        .expect("LOGIN_ATTEMPTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSION_DECODE_FAILURES_TOTAL.clone()))
        .expect("SESSION_DECODE_FAILURES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CREDENTIALS_TOTAL.clone()))
        .expect("CREDENTIALS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
