//! Bearer-credential handling
//!
//! `extract_bearer` pulls the token out of an `Authorization` header value.
//! `SessionStore` holds the platform session token shared across requests:
//! absent until a login succeeds, overwritten by every later login, last
//! writer wins.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{GatewayError, GatewayResult};

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization` header value.
pub fn extract_bearer(header: &str) -> GatewayResult<&str> {
    header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        GatewayError::Unauthorized("invalid or missing Authorization header".to_string())
    })
}

/// Shared session token, replacing a process-global with an explicit handle
/// passed through the request-handling chain.
#[derive(Clone, Default)]
pub struct SessionStore {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123").unwrap(), "abc123");
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        assert!(matches!(
            extract_bearer("Token abc"),
            Err(GatewayError::Unauthorized(_))
        ));
        assert!(extract_bearer("bearer abc").is_err());
        assert!(extract_bearer("").is_err());
    }

    #[tokio::test]
    async fn test_session_store_last_writer_wins() {
        let store = SessionStore::new();
        assert!(store.get().await.is_none());

        store.set("first".to_string()).await;
        store.set("second".to_string()).await;
        assert_eq!(store.get().await.as_deref(), Some("second"));
    }
}
