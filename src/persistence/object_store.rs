//! Object-store sink
//!
//! Writes each payload as a single JSON object named `<destination>.json`
//! into a pre-provisioned bucket. Construction verifies the bucket and
//! creates it in the configured region when the store reports not-found;
//! any other provisioning error is fatal at startup.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use tracing::{info, warn};

use super::{PersistenceSink, SaveRequest};
use crate::config::ObjectStoreConfig;
use crate::error::{GatewayError, GatewayResult};

pub struct ObjectStoreSink {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
}

impl ObjectStoreSink {
    pub async fn connect(config: &ObjectStoreConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(key_id), Some(secret)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "gateway-env",
            ));
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint_url {
            // Path-style addressing for MinIO and other custom endpoints.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let sink = Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
        };
        sink.ensure_bucket().await?;
        Ok(sink)
    }

    async fn ensure_bucket(&self) -> Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "bucket already exists");
                Ok(())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if !service_err.is_not_found() {
                    return Err(anyhow!(service_err).context("Failed to check bucket"));
                }

                let constraint = CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build();
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .create_bucket_configuration(constraint)
                    .send()
                    .await
                    .with_context(|| format!("Failed to create bucket '{}'", self.bucket))?;

                info!(bucket = %self.bucket, region = %self.region, "bucket created");
                Ok(())
            }
        }
    }
}

/// Object name for a save destination.
fn object_key(destination: &str) -> String {
    format!("{destination}.json")
}

#[async_trait]
impl PersistenceSink for ObjectStoreSink {
    async fn save(
        &self,
        payload: &serde_json::Value,
        request: SaveRequest<'_>,
    ) -> GatewayResult<bool> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| GatewayError::Persistence(format!("payload serialization: {e}")))?;
        let key = object_key(request.destination);

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(bucket = %self.bucket, key = %key, "telemetry payload saved");
                Ok(true)
            }
            Err(err) => {
                // Caught and reported, not retried.
                warn!(bucket = %self.bucket, key = %key, error = %err, "object store write failed");
                Ok(false)
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "object-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_naming() {
        assert_eq!(object_key("device_telemetry"), "device_telemetry.json");
    }
}
