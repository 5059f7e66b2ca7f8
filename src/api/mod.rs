//! API layer
//!
//! HTTP handlers for:
//! - HTML pages (landing, login, dashboard, 401)
//! - Metrics (Prometheus)

pub mod metrics;
pub mod pages;

pub use metrics::metrics_router;
pub use pages::landing;
