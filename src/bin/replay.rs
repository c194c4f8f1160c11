//! Replay a sensor-readings CSV into the telemetry platform over MQTT.
//!
//! Each row is published to the device telemetry topic with a synthetic
//! hourly timestamp, paced so the platform ingests readings in order.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Deserialize;
use tracing::{info, warn};

const TELEMETRY_TOPIC: &str = "v1/devices/me/telemetry";
const REPLAY_EPOCH: &str = "2024-01-01T00:00:00Z";

#[derive(Parser)]
#[command(
    name = "replay_csv",
    about = "Replay a sensor CSV into the telemetry platform over MQTT"
)]
struct Args {
    /// Device access token, used as the MQTT username
    #[arg(long, env = "ACCESS_TOKEN")]
    access_token: String,

    #[arg(long, env = "MQTT_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    port: u16,

    /// CSV file of sensor readings to replay
    #[arg(default_value = "iot_telemetry_data.csv")]
    csv_file: PathBuf,

    /// Pause between published readings, in milliseconds
    #[arg(long, default_value_t = 300)]
    pace_ms: u64,
}

/// One CSV row. Extra columns in the file are ignored.
#[derive(Debug, Deserialize)]
struct SensorRecord {
    device: String,
    co: f64,
    humidity: f64,
    light: String,
    lpg: f64,
    motion: String,
    smoke: f64,
    temp: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl SensorRecord {
    /// Telemetry values as published. Gas readings are scaled from their raw
    /// fractions to ppm-range magnitudes; everything numeric is rounded to
    /// one decimal.
    fn values(&self) -> serde_json::Value {
        serde_json::json!({
            "co": round1(self.co * 1000.0),
            "humidity": round1(self.humidity),
            "light": self.light.eq_ignore_ascii_case("true"),
            "lpg": round1(self.lpg * 1000.0),
            "motion": self.motion.eq_ignore_ascii_case("true"),
            "smoke": round1(self.smoke * 1000.0),
            "temp": round1(self.temp),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "replay_csv=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut options = MqttOptions::new("telemetry-replay", &args.host, args.port);
    options.set_credentials(&args.access_token, "");
    options.set_keep_alive(Duration::from_secs(30));

    let (client, mut event_loop) = AsyncClient::new(options, 10);

    // Acks and keep-alives flow through the event loop; drive it aside.
    tokio::spawn(async move {
        loop {
            if let Err(err) = event_loop.poll().await {
                warn!(error = %err, "mqtt connection error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    let start: chrono::DateTime<chrono::Utc> =
        REPLAY_EPOCH.parse().context("Failed to parse replay epoch")?;
    let mut reader = csv::Reader::from_path(&args.csv_file)
        .with_context(|| format!("Failed to open {}", args.csv_file.display()))?;

    let mut sent = 0usize;
    for (index, record) in reader.deserialize::<SensorRecord>().enumerate() {
        let record = record.context("Failed to parse CSV record")?;

        // Synthetic hourly timestamps, one per row.
        let ts_ms = (start + chrono::Duration::hours(index as i64)).timestamp_millis();
        let message = serde_json::json!({ "ts": ts_ms, "values": record.values() });

        match client
            .publish(
                TELEMETRY_TOPIC,
                QoS::AtLeastOnce,
                false,
                message.to_string(),
            )
            .await
        {
            Ok(()) => {
                sent += 1;
                info!(device = %record.device, ts_ms, "telemetry published");
            }
            Err(err) => {
                warn!(device = %record.device, error = %err, "failed to publish telemetry");
            }
        }

        tokio::time::sleep(Duration::from_millis(args.pace_ms)).await;
    }

    client.disconnect().await.ok();
    info!(sent, "replay finished");
    Ok(())
}
