//! Error handling for the telemetry gateway
//!
//! One taxonomy for the whole request pipeline, using thiserror. Errors are
//! propagated to the HTTP boundary and translated to status codes there and
//! only there.

use thiserror::Error;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("time format error, accepted formats: {}", .accepted.join(", "))]
    InvalidTimeFormat { accepted: Vec<String> },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("telemetry platform base URL is not configured")]
    MisconfiguredEndpoint,

    #[error("invalid telemetry key set: {0}")]
    InvalidKeySet(String),

    #[error("table_name is required when savebase is set")]
    MissingDestination,

    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("failed to save telemetry payload")]
    PersistenceFailed,

    #[error("{0}")]
    Internal(String),
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// HTTP status the error maps to at the boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidTimeFormat { .. }
            | GatewayError::InvalidKeySet(_)
            | GatewayError::MissingDestination => 400,
            GatewayError::Unauthorized(_) => 401,
            // Upstream failures pass the remote status through verbatim.
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::MisconfiguredEndpoint
            | GatewayError::Transport(_)
            | GatewayError::Persistence(_)
            | GatewayError::PersistenceFailed
            | GatewayError::Internal(_) => 500,
        }
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = GatewayError::Unauthorized("no token".to_string());
        assert_eq!(err.status_code(), 401);

        let err = GatewayError::Upstream {
            status: 404,
            body: "device not found".to_string(),
        };
        assert_eq!(err.status_code(), 404);

        assert_eq!(GatewayError::MissingDestination.status_code(), 400);
        assert_eq!(GatewayError::PersistenceFailed.status_code(), 500);
        assert_eq!(GatewayError::MisconfiguredEndpoint.status_code(), 500);
    }

    #[test]
    fn test_invalid_time_format_lists_accepted() {
        let err = GatewayError::InvalidTimeFormat {
            accepted: vec!["%Y-%m-%dT%H:%M:%S%.fZ".to_string(), "%Y-%m-%dT%H:%M:%SZ".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("%Y-%m-%dT%H:%M:%S%.fZ"));
        assert!(msg.contains("%Y-%m-%dT%H:%M:%SZ"));
    }
}
