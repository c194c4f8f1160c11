//! Telemetry platform client
//!
//! HTTP client for the platform's login and timeseries endpoints. Each call
//! is a single blocking exchange from the caller's point of view; no retry.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::types::{LoginCredentials, TelemetryQuery};
use crate::auth::SessionStore;
use crate::error::{GatewayError, GatewayResult};

const TIMESERIES_PATH: &str = "/api/plugins/telemetry";
const LOGIN_PATH: &str = "/api/auth/login";

pub struct PlatformClient {
    http: Client,
    base_url: Option<Url>,
    session: SessionStore,
}

impl PlatformClient {
    /// Build a client. A missing base URL is allowed here; calls against it
    /// fail with a misconfiguration error instead.
    pub fn new(base_url: Option<&str>, session: SessionStore) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = match base_url {
            Some(raw) => {
                Some(Url::parse(raw).with_context(|| format!("Invalid base URL '{raw}'"))?)
            }
            None => None,
        };

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    fn base_url(&self) -> GatewayResult<&Url> {
        self.base_url
            .as_ref()
            .ok_or(GatewayError::MisconfiguredEndpoint)
    }

    /// Target URL and query parameters for a timeseries fetch. `startTs`,
    /// `endTs` and `limit` are always present; `interval`, `agg` and `keys`
    /// only when the caller supplied them.
    fn timeseries_request(
        &self,
        query: &TelemetryQuery,
    ) -> GatewayResult<(Url, Vec<(&'static str, String)>)> {
        let url = self
            .base_url()?
            .join(&format!(
                "{}/{}/{}/values/timeseries",
                TIMESERIES_PATH, query.entity_type, query.entity_id
            ))
            .map_err(|_| GatewayError::MisconfiguredEndpoint)?;

        let mut params = vec![
            ("startTs", query.window.start_ms.to_string()),
            ("endTs", query.window.end_ms.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(interval) = query.interval_ms {
            params.push(("interval", interval.to_string()));
        }
        if let Some(agg) = query.aggregation {
            params.push(("agg", agg.as_str().to_string()));
        }
        if let Some(keys) = query.keys_param()? {
            params.push(("keys", keys));
        }

        Ok((url, params))
    }

    /// Fetch time-range telemetry for an entity.
    ///
    /// The bearer credential is the explicit `token` argument when given,
    /// otherwise the stored session token. The JSON body is returned
    /// verbatim; no shape validation beyond parsing.
    pub async fn fetch_timeseries(
        &self,
        query: &TelemetryQuery,
        token: Option<&str>,
    ) -> GatewayResult<serde_json::Value> {
        let (url, params) = self.timeseries_request(query)?;

        let token = match token {
            Some(token) => token.to_string(),
            None => self.session.get().await.ok_or_else(|| {
                GatewayError::Unauthorized("no session token available".to_string())
            })?,
        };

        debug!(%url, entity_id = %query.entity_id, "fetching telemetry");

        let response = self
            .http
            .get(url)
            .query(&params)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream { status, body });
        }

        Ok(response.json().await?)
    }

    /// Authenticate against the platform and return the session token from
    /// the response.
    pub async fn login(&self, credentials: &LoginCredentials) -> GatewayResult<String> {
        let url = self
            .base_url()?
            .join(LOGIN_PATH)
            .map_err(|_| GatewayError::MisconfiguredEndpoint)?;

        debug!(username = %credentials.username, "logging in to telemetry platform");

        let response = self.http.post(url).json(credentials).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream { status, body });
        }

        let body: serde_json::Value = response.json().await?;
        match body.get("token").and_then(|token| token.as_str()) {
            Some(token) => Ok(token.to_string()),
            None => Err(GatewayError::Internal(
                "token not found in login response".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::types::{Aggregation, TimeWindow};

    fn query() -> TelemetryQuery {
        TelemetryQuery {
            entity_type: "DEVICE".to_string(),
            entity_id: "784f394c-42b6-435a-983c-b7beff2784f9".to_string(),
            window: TimeWindow {
                start_ms: 1_704_067_200_000,
                end_ms: 1_704_067_201_000,
            },
            limit: 100,
            interval_ms: None,
            aggregation: None,
            keys: None,
        }
    }

    fn client(base: Option<&str>) -> PlatformClient {
        PlatformClient::new(base, SessionStore::new()).unwrap()
    }

    #[test]
    fn test_timeseries_url_and_required_params() {
        let client = client(Some("http://platform.local:8080/ignored"));
        let (url, params) = client.timeseries_request(&query()).unwrap();

        assert_eq!(
            url.as_str(),
            "http://platform.local:8080/api/plugins/telemetry/DEVICE/784f394c-42b6-435a-983c-b7beff2784f9/values/timeseries"
        );
        assert_eq!(
            params,
            vec![
                ("startTs", "1704067200000".to_string()),
                ("endTs", "1704067201000".to_string()),
                ("limit", "100".to_string()),
            ]
        );
    }

    #[test]
    fn test_optional_params_included_when_set() {
        let client = client(Some("http://platform.local:8080"));
        let mut q = query();
        q.interval_ms = Some(60_000);
        q.aggregation = Some(Aggregation::Avg);
        q.keys = Some(vec!["temp".to_string(), "humidity".to_string()]);

        let (_, params) = client.timeseries_request(&q).unwrap();
        assert!(params.contains(&("interval", "60000".to_string())));
        assert!(params.contains(&("agg", "AVG".to_string())));
        assert!(params.contains(&("keys", "temp,humidity".to_string())));
    }

    #[test]
    fn test_missing_base_url_is_misconfiguration() {
        let client = client(None);
        assert!(matches!(
            client.timeseries_request(&query()),
            Err(GatewayError::MisconfiguredEndpoint)
        ));
    }

    #[test]
    fn test_invalid_key_set_surfaces() {
        let client = client(Some("http://platform.local:8080"));
        let mut q = query();
        q.keys = Some(vec!["temp".to_string(), "temp".to_string()]);
        assert!(matches!(
            client.timeseries_request(&q),
            Err(GatewayError::InvalidKeySet(_))
        ));
    }
}
