//! Offline stand-ins for the network.
//!
//! Each service brings a `MockResponder` mapping `(path, method)` to a canned
//! envelope. The executor calls it instead of the transport whenever mock
//! mode is on, and returns whatever it produces without retrying.

use async_trait::async_trait;
use serde_json::json;

use crate::error::ApiError;
use crate::http::{HttpMethod, RequestConfig};
use crate::response::ResponseEnvelope;

#[async_trait]
pub trait MockResponder: Send + Sync {
    async fn respond(
        &self,
        path: &str,
        method: HttpMethod,
        config: &RequestConfig,
    ) -> Result<ResponseEnvelope, ApiError>;
}

#[async_trait]
impl<F> MockResponder for F
where
    F: Fn(&str, HttpMethod, &RequestConfig) -> Result<ResponseEnvelope, ApiError> + Send + Sync,
{
    async fn respond(
        &self,
        path: &str,
        method: HttpMethod,
        config: &RequestConfig,
    ) -> Result<ResponseEnvelope, ApiError> {
        self(path, method, config)
    }
}

/// Answers every call with an empty JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResponder;

#[async_trait]
impl MockResponder for EmptyResponder {
    async fn respond(
        &self,
        path: &str,
        method: HttpMethod,
        _config: &RequestConfig,
    ) -> Result<ResponseEnvelope, ApiError> {
        tracing::debug!(%method, path, "empty mock response");
        Ok(ResponseEnvelope::json(json!({})))
    }
}
