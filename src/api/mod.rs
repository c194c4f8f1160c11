//! REST API module for the telemetry gateway
//!
//! HTTP endpoints proxying the telemetry platform: login, time-range query
//! with optional persistence, health.

#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub use routes::{create_router, AppState};
