//! Telemetry platform integration
//!
//! This module provides:
//! - Wire types for the platform's timeseries and login endpoints
//! - Client for logging in and fetching time-range telemetry

pub mod client;
pub mod types;

pub use client::PlatformClient;
pub use types::*;
