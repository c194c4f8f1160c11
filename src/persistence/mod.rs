//! Persistence sinks for fetched telemetry payloads
//!
//! A sink durably stores one payload per call. Which implementation handles
//! a request is decided by configuration at startup, not by branching in the
//! request handler.

use async_trait::async_trait;

use crate::error::GatewayResult;

#[cfg(feature = "cloud")]
pub mod object_store;
#[cfg(feature = "database")]
pub mod warehouse;

#[cfg(feature = "cloud")]
pub use object_store::ObjectStoreSink;
#[cfg(feature = "database")]
pub use warehouse::WarehouseSink;

/// Where a payload is being saved. `destination` names the stored artifact
/// (object name, table label); `entity_id` identifies the device the
/// measurements belong to, for sinks that record it per row.
#[derive(Debug, Clone, Copy)]
pub struct SaveRequest<'a> {
    pub entity_id: &'a str,
    pub destination: &'a str,
}

/// A destination that durably persists a fetched telemetry payload.
///
/// `Ok(false)` reports a caught, non-retried write failure; `Err` reports a
/// failure that aborted the whole save. Callers treat both as fatal for the
/// triggering request.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(&self, payload: &serde_json::Value, request: SaveRequest<'_>)
        -> GatewayResult<bool>;

    fn backend_name(&self) -> &'static str;
}
