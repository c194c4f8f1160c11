//! Warehouse sink
//!
//! Persists payloads into the fixed-schema `DEVICE_TELEMETRY` table, one row
//! per (telemetry key, measurement). All inserts for one payload run in a
//! single transaction: any failure rolls the whole save back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use tracing::info;

use super::{PersistenceSink, SaveRequest};
use crate::config::WarehouseConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::platform::types::TelemetryPayload;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS DEVICE_TELEMETRY (
    ENTITY_ID VARCHAR(255),
    TELEMETRY_KEY VARCHAR(255),
    TIMESTAMP TIMESTAMP,
    VALUE VARCHAR(255),
    CREATED_AT TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

const INSERT_SQL: &str = r#"
INSERT INTO DEVICE_TELEMETRY (ENTITY_ID, TELEMETRY_KEY, TIMESTAMP, VALUE)
VALUES ($1, $2, $3, $4)
"#;

pub struct WarehouseSink {
    pool: PgPool,
}

impl WarehouseSink {
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let pool = PgPool::connect(&config.dsn())
            .await
            .context("Failed to connect to warehouse")?;
        Ok(Self { pool })
    }
}

/// One `DEVICE_TELEMETRY` row waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
struct TelemetryRow {
    key: String,
    timestamp: NaiveDateTime,
    value: String,
}

/// Flatten a payload into rows, truncating each millisecond timestamp to a
/// whole second.
fn rows_for(payload: &TelemetryPayload) -> GatewayResult<Vec<TelemetryRow>> {
    let mut rows = Vec::new();
    for (key, measurements) in payload {
        for measurement in measurements {
            let seconds = measurement.ts.div_euclid(1000);
            let timestamp = chrono::DateTime::from_timestamp(seconds, 0)
                .ok_or_else(|| {
                    GatewayError::Persistence(format!("timestamp out of range: {}", measurement.ts))
                })?
                .naive_utc();
            rows.push(TelemetryRow {
                key: key.clone(),
                timestamp,
                value: measurement.value_text(),
            });
        }
    }
    Ok(rows)
}

#[async_trait]
impl PersistenceSink for WarehouseSink {
    async fn save(
        &self,
        payload: &serde_json::Value,
        request: SaveRequest<'_>,
    ) -> GatewayResult<bool> {
        let typed: TelemetryPayload = serde_json::from_value(payload.clone())
            .map_err(|e| GatewayError::Persistence(format!("unexpected payload shape: {e}")))?;
        let rows = rows_for(&typed)?;

        let persistence = |e: sqlx::Error| GatewayError::Persistence(e.to_string());

        // The transaction rolls back when dropped without a commit.
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        sqlx::query(CREATE_TABLE_SQL)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        for row in &rows {
            sqlx::query(INSERT_SQL)
                .bind(request.entity_id)
                .bind(&row.key)
                .bind(row.timestamp)
                .bind(&row.value)
                .execute(&mut *tx)
                .await
                .map_err(persistence)?;
        }

        tx.commit().await.map_err(persistence)?;

        info!(
            entity_id = %request.entity_id,
            rows = rows.len(),
            "telemetry payload saved to warehouse"
        );
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "warehouse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::types::TelemetryValue;

    #[test]
    fn test_rows_flatten_with_whole_second_timestamps() {
        let mut payload = TelemetryPayload::new();
        payload.insert(
            "temp".to_string(),
            vec![
                TelemetryValue {
                    ts: 1_704_067_200_511,
                    value: serde_json::json!("21.5"),
                },
                TelemetryValue {
                    ts: 1_704_070_800_000,
                    value: serde_json::json!(22.0),
                },
            ],
        );

        let rows = rows_for(&payload).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "temp");
        // 511ms fraction truncated to the containing second
        assert_eq!(
            rows[0].timestamp,
            chrono::DateTime::from_timestamp(1_704_067_200, 0).unwrap().naive_utc()
        );
        assert_eq!(rows[0].value, "21.5");
        assert_eq!(rows[1].value, "22.0");
    }

    #[test]
    fn test_rows_one_per_key_measurement_pair() {
        let mut payload = TelemetryPayload::new();
        for key in ["temp", "humidity", "co"] {
            payload.insert(
                key.to_string(),
                vec![TelemetryValue {
                    ts: 1_704_067_200_000,
                    value: serde_json::json!(1),
                }],
            );
        }
        assert_eq!(rows_for(&payload).unwrap().len(), 3);
    }

    #[test]
    fn test_empty_payload_yields_no_rows() {
        assert!(rows_for(&TelemetryPayload::new()).unwrap().is_empty());
    }
}
