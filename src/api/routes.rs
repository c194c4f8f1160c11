//! Request handlers
//!
//! The query handler walks one request through authentication, time-window
//! conversion, the upstream fetch, and optional persistence. Errors reach
//! the boundary as their mapped status codes; nothing is retried.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::auth::{extract_bearer, SessionStore};
use crate::error::{GatewayError, GatewayResult};
use crate::persistence::{PersistenceSink, SaveRequest};
use crate::platform::{Aggregation, LoginCredentials, PlatformClient, TelemetryQuery, TimeWindow};
use crate::time;

// Application state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<PlatformClient>,
    pub session: SessionStore,
    pub sink: Arc<dyn PersistenceSink>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

fn default_limit() -> i64 {
    100
}

/// Query parameters for `/get-elements`, with the wire names the endpoint
/// has always used.
#[derive(Debug, Deserialize)]
pub struct GetElementsParams {
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    #[serde(rename = "start-date")]
    pub start_date: String,
    #[serde(rename = "end-date")]
    pub end_date: String,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(rename = "aggregation_function", default)]
    pub aggregation_function: Option<Aggregation>,
    /// Comma-separated list of telemetry keys.
    #[serde(default)]
    pub telemetry_keys: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(rename = "LIMIT", default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub savebase: bool,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/get-elements", get(get_elements))
        .route("/api/health", get(health_check))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse {
        success: true,
        data: Some("OK".to_string()),
        error: None,
    })
}

/// Authenticate against the platform and replace the stored session token.
async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> GatewayResult<Json<serde_json::Value>> {
    let token = state.client.login(&credentials).await?;
    state.session.set(token.clone()).await;
    info!(username = %credentials.username, "session token replaced");
    Ok(Json(serde_json::json!({ "token": token })))
}

/// Fetch time-range telemetry for an entity, optionally persisting the
/// payload before responding.
async fn get_elements(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<GetElementsParams>,
) -> GatewayResult<Json<serde_json::Value>> {
    // Explicit bearer header wins; the stored session token is the fallback.
    let token = match headers.get(AUTHORIZATION) {
        Some(value) => {
            let value = value.to_str().map_err(|_| {
                GatewayError::Unauthorized("invalid Authorization header".to_string())
            })?;
            extract_bearer(value)?.to_string()
        }
        None => state.session.get().await.ok_or_else(|| {
            GatewayError::Unauthorized("user not authenticated, login first".to_string())
        })?,
    };

    let (start_ms, end_ms) = time::convert_range(&params.start_date, &params.end_date, true)?;

    let keys = params
        .telemetry_keys
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.split(',').map(str::to_string).collect::<Vec<_>>());

    let query = TelemetryQuery {
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        window: TimeWindow { start_ms, end_ms },
        limit: params.limit,
        interval_ms: params.interval,
        aggregation: params.aggregation_function,
        keys,
    };

    let payload = state.client.fetch_timeseries(&query, Some(&token)).await?;

    if params.savebase {
        let destination = params
            .table_name
            .as_deref()
            .ok_or(GatewayError::MissingDestination)?;
        let saved = state
            .sink
            .save(
                &payload,
                SaveRequest {
                    entity_id: &query.entity_id,
                    destination,
                },
            )
            .await?;
        if !saved {
            // The fetch succeeded, but the caller asked for persistence:
            // a failed save fails the whole request.
            return Err(GatewayError::PersistenceFailed);
        }
    }

    Ok(Json(payload))
}
