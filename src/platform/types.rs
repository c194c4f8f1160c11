//! Query and payload types for the telemetry platform

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Epoch-millisecond query window. The platform accepts inverted windows and
/// answers them with empty series, so ordering is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Server-side reduction applied over an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    Min,
    Max,
    Avg,
    Sum,
    Count,
    None,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
            Aggregation::Avg => "AVG",
            Aggregation::Sum => "SUM",
            Aggregation::Count => "COUNT",
            Aggregation::None => "NONE",
        }
    }
}

/// One outbound timeseries query, built per inbound request.
#[derive(Debug, Clone)]
pub struct TelemetryQuery {
    pub entity_type: String,
    pub entity_id: String,
    pub window: TimeWindow,
    pub limit: i64,
    pub interval_ms: Option<i64>,
    pub aggregation: Option<Aggregation>,
    pub keys: Option<Vec<String>>,
}

impl TelemetryQuery {
    /// Serialize the key filter as the comma-joined `keys` parameter.
    ///
    /// The filter must be a set: empty or duplicate keys are rejected rather
    /// than forwarded.
    pub fn keys_param(&self) -> GatewayResult<Option<String>> {
        let Some(keys) = &self.keys else {
            return Ok(None);
        };
        if keys.is_empty() {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        for key in keys {
            if key.trim().is_empty() {
                return Err(GatewayError::InvalidKeySet("empty key".to_string()));
            }
            if !seen.insert(key.as_str()) {
                return Err(GatewayError::InvalidKeySet(format!("duplicate key '{key}'")));
            }
        }
        Ok(Some(keys.join(",")))
    }
}

/// One measurement in a telemetry series. The platform encodes values as
/// JSON scalars of varying types; they are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryValue {
    pub ts: i64,
    pub value: serde_json::Value,
}

impl TelemetryValue {
    /// Textual form of the value, as stored by the warehouse sink.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Telemetry key to ordered measurement series, the shape the timeseries
/// endpoint returns.
pub type TelemetryPayload = HashMap<String, Vec<TelemetryValue>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}
