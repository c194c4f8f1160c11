//! Thin gateway in front of a remote IoT telemetry platform.
//!
//! The library authenticates against the platform, proxies time-range
//! telemetry queries to its timeseries endpoint, and optionally persists the
//! fetched payload into an object store or a warehouse reached over the
//! postgres wire protocol. A separate replay binary pushes CSV sensor
//! readings back into the platform over MQTT.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod persistence;
pub mod platform;
pub mod time;

pub use auth::{extract_bearer, SessionStore};
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use platform::{Aggregation, PlatformClient, TelemetryQuery, TimeWindow};
