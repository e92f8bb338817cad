//! The request executor every domain service is built on.
//!
//! # Design
//! A `Service` is created once per API domain and shared by reference. It
//! copies its settings out of `AppConfig` at construction and never reads the
//! config again. A call either goes to the service's `MockResponder` (mock
//! mode, no I/O, no retries) or through `build_request` → `Transport` →
//! `parse_response`, with each attempt bounded by a timeout and failed
//! attempts retried with exponential backoff. Client errors (4xx) stop the
//! loop immediately. The final error is reported to the `ErrorHandler` and
//! then returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handler::ErrorHandler;
use crate::http::{set_header, HttpMethod, HttpRequest, HttpResponse, QueryParams, RequestConfig};
use crate::mock::MockResponder;
use crate::response::{Payload, ResponseEnvelope};
use crate::session::{MemorySessionStore, SessionStore};
use crate::transport::{ReqwestTransport, Transport};

/// Base used when live mode runs without a configured base URL.
const FALLBACK_BASE_URL: &str = "http://mock.local";

/// Collaborators shared by every service, assembled once at startup.
#[derive(Clone)]
pub struct ServiceContext {
    pub config: Arc<AppConfig>,
    pub transport: Arc<dyn Transport>,
    pub sessions: Arc<dyn SessionStore>,
    pub errors: Arc<ErrorHandler>,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("config", &self.config)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl ServiceContext {
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        sessions: Arc<dyn SessionStore>,
        errors: Arc<ErrorHandler>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            sessions,
            errors,
        }
    }

    /// Validate `config` and wire up the default collaborators: a reqwest
    /// transport, an in-memory session store and an error handler with the
    /// network recovery strategy.
    pub fn from_config(config: AppConfig) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self::new(
            config,
            Arc::new(ReqwestTransport::new()?),
            Arc::new(MemorySessionStore::new()),
            Arc::new(ErrorHandler::default()),
        ))
    }
}

/// Settings a service captured from `AppConfig` when it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub mock_mode: bool,
    pub token_prefix: String,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            timeout: config.api.timeout,
            max_retries: config.api.retry_attempts,
            retry_delay: config.api.retry_delay,
            mock_mode: config.api.mock_mode,
            token_prefix: config.auth.token_prefix.clone(),
        }
    }
}

/// Delay before retry number `attempt + 1`: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

pub struct Service {
    name: String,
    endpoint: Option<String>,
    settings: ServiceSettings,
    transport: Arc<dyn Transport>,
    sessions: Arc<dyn SessionStore>,
    errors: Arc<ErrorHandler>,
    responder: Arc<dyn MockResponder>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Service {
    pub fn new(
        name: &str,
        endpoint: Option<&str>,
        context: &ServiceContext,
        responder: Arc<dyn MockResponder>,
    ) -> Self {
        let settings = ServiceSettings::from_config(&context.config);
        tracing::info!(
            service = name,
            base_url = %settings.base_url,
            endpoint = endpoint.unwrap_or(""),
            mock_mode = settings.mock_mode,
            environment = %context.config.environment,
            "service initialized"
        );
        Self {
            name: name.to_string(),
            endpoint: endpoint.map(str::to_string),
            settings,
            transport: Arc::clone(&context.transport),
            sessions: Arc::clone(&context.sessions),
            errors: Arc::clone(&context.errors),
            responder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn is_mock(&self) -> bool {
        self.settings.mock_mode
    }

    /// Run one call described by `config` against `path`.
    pub async fn execute(&self, path: &str, config: RequestConfig) -> Result<ResponseEnvelope, ApiError> {
        if self.settings.mock_mode || config.mock {
            tracing::debug!(service = %self.name, method = %config.method, path, "using mock responder");
            return self.responder.respond(path, config.method, &config).await;
        }

        let request = self.build_request(path, &config)?;
        let timeout = config
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(self.settings.timeout);
        let retries = config.retries.unwrap_or(self.settings.max_retries);

        let mut last_error = None;
        for attempt in 0..=retries {
            match self.attempt(&request, timeout).await {
                Ok(envelope) => return Ok(envelope),
                Err(err) => {
                    let retriable = err.is_retriable();
                    tracing::debug!(
                        service = %self.name,
                        url = %request.url,
                        attempt,
                        error = %err,
                        "request attempt failed"
                    );
                    last_error = Some(err);
                    if !retriable {
                        break;
                    }
                    if attempt < retries {
                        tokio::time::sleep(backoff_delay(self.settings.retry_delay, attempt)).await;
                        tracing::warn!(
                            service = %self.name,
                            attempt = attempt + 1,
                            retries,
                            "retrying request"
                        );
                    }
                }
            }
        }

        let err = last_error
            .unwrap_or_else(|| ApiError::Transport("request failed after all retry attempts".into()));
        self.errors.report(&err);
        Err(err)
    }

    async fn attempt(&self, request: &HttpRequest, timeout: Duration) -> Result<ResponseEnvelope, ApiError> {
        let response = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| ApiError::Timeout { after: timeout })??;
        parse_response(response)
    }

    /// Build the concrete request `execute` would send for a live call.
    pub fn build_request(&self, path: &str, config: &RequestConfig) -> Result<HttpRequest, ApiError> {
        let url = self.build_url(path, &config.params)?;
        let headers = self.build_headers(&config.headers);
        let body = match (&config.body, config.method) {
            (Some(body), method) if method != HttpMethod::Get => Some(
                serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?,
            ),
            _ => None,
        };
        Ok(HttpRequest {
            method: config.method,
            url,
            headers,
            body,
        })
    }

    fn build_url(&self, path: &str, params: &QueryParams) -> Result<String, ApiError> {
        let pairs = params
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.as_str(), v.to_string())));

        if self.settings.mock_mode && self.settings.base_url.is_empty() {
            let query: String = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            return Ok(if query.is_empty() {
                path.to_string()
            } else {
                format!("{path}?{query}")
            });
        }

        let base = if self.settings.base_url.is_empty() {
            FALLBACK_BASE_URL
        } else {
            self.settings.base_url.as_str()
        };
        let joined = join_url(base, self.endpoint.as_deref().unwrap_or(""), path);
        let mut url = url::Url::parse(&joined)
            .map_err(|e| ApiError::Transport(format!("invalid url {joined}: {e}")))?;
        {
            let mut pairs = pairs.peekable();
            if pairs.peek().is_some() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }
        Ok(url.to_string())
    }

    fn build_headers(&self, custom: &[(String, String)]) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        for (name, value) in custom {
            set_header(&mut headers, name, value.clone());
        }
        if let Some(token) = self.sessions.token() {
            set_header(
                &mut headers,
                "Authorization",
                format!("{} {token}", self.settings.token_prefix),
            );
        }
        headers
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        config: RequestConfig,
    ) -> Result<ResponseEnvelope<T>, ApiError> {
        self.execute(path, config).await?.decode()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: QueryParams,
    ) -> Result<ResponseEnvelope<T>, ApiError> {
        self.call(path, RequestConfig::new(HttpMethod::Get).with_params(params))
            .await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        params: QueryParams,
    ) -> Result<ResponseEnvelope<T>, ApiError> {
        self.call(path, with_body(HttpMethod::Post, body, params)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        params: QueryParams,
    ) -> Result<ResponseEnvelope<T>, ApiError> {
        self.call(path, with_body(HttpMethod::Put, body, params)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        params: QueryParams,
    ) -> Result<ResponseEnvelope<T>, ApiError> {
        self.call(path, with_body(HttpMethod::Patch, body, params)).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: QueryParams,
    ) -> Result<ResponseEnvelope<T>, ApiError> {
        self.call(path, RequestConfig::new(HttpMethod::Delete).with_params(params))
            .await
    }
}

/// Concatenate base, endpoint and path. A segment without a leading `/` gets
/// one, so it cannot merge into the authority.
fn join_url(base: &str, endpoint: &str, path: &str) -> String {
    let mut joined = base.to_string();
    for segment in [endpoint, path] {
        if !segment.is_empty() && !segment.starts_with('/') && !segment.starts_with('?') {
            joined.push('/');
        }
        joined.push_str(segment);
    }
    joined
}

fn with_body(method: HttpMethod, body: Option<Value>, params: QueryParams) -> RequestConfig {
    RequestConfig {
        body,
        ..RequestConfig::new(method).with_params(params)
    }
}

/// Map a raw response to an envelope: non-2xx becomes `ApiError::Http`, and
/// the body is decoded by its content type.
pub fn parse_response(response: HttpResponse) -> Result<ResponseEnvelope, ApiError> {
    if !response.is_success() {
        return Err(ApiError::http(response.status));
    }
    let content_type = response.header("content-type").unwrap_or("").to_ascii_lowercase();
    let data = if content_type.contains("application/json") {
        if response.body.is_empty() {
            Payload::Json(Value::Null)
        } else {
            Payload::Json(
                serde_json::from_slice(&response.body)
                    .map_err(|e| ApiError::Deserialization(e.to_string()))?,
            )
        }
    } else if content_type.contains("text/") {
        Payload::Text(String::from_utf8_lossy(&response.body).into_owned())
    } else {
        Payload::Binary(response.body)
    };
    Ok(ResponseEnvelope::new(data, response.status, response.headers))
}
