use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::error::ApiError;
use crate::fixtures;
use crate::http::{HttpMethod, RequestConfig};
use crate::mock::MockResponder;
use crate::response::ResponseEnvelope;
use crate::types::{AuthResponse, User};

/// Offline auth backend: every login succeeds, as the fixture user with the
/// given email or else the fixture admin.
#[derive(Debug, Clone)]
pub struct AuthMock {
    latency: Duration,
}

impl Default for AuthMock {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl AuthMock {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn issue(user: User) -> Result<ResponseEnvelope, ApiError> {
        let response = AuthResponse {
            user,
            token: format!("mock-token-{}", Utc::now().timestamp_millis()),
            refresh_token: None,
            expires_in: 3600,
        };
        let data = serde_json::to_value(response).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(ResponseEnvelope::json(data))
    }
}

#[async_trait]
impl MockResponder for AuthMock {
    async fn respond(
        &self,
        path: &str,
        method: HttpMethod,
        config: &RequestConfig,
    ) -> Result<ResponseEnvelope, ApiError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if path.contains("login") {
            let email = config
                .body
                .as_ref()
                .and_then(|b| b.get("email"))
                .and_then(|e| e.as_str())
                .unwrap_or("");
            tracing::debug!(email, "mock login");
            let user = fixtures::mock_users()
                .into_iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .unwrap_or_else(fixtures::default_user);
            return Self::issue(user);
        }
        if path.contains("oauth") || path.contains("refresh") {
            return Self::issue(fixtures::default_user());
        }
        if path.contains("logout") {
            return Ok(ResponseEnvelope::json(json!({ "success": true })));
        }

        tracing::warn!(%method, path, "unhandled mock auth endpoint");
        Ok(ResponseEnvelope::json(json!({})))
    }
}
