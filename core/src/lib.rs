//! Service client core for the A-SW Hub API.
//!
//! # Overview
//! Every API domain is served by a `Service`: a request executor that builds
//! URLs and headers, runs the call under a timeout with exponential-backoff
//! retries, and decodes the response by content type. In mock mode the same
//! calls are answered by a per-service `MockResponder` without any I/O.
//!
//! # Design
//! - Collaborators (config, transport, session store, error handler) are
//!   assembled once into a `ServiceContext` and injected; nothing is global.
//! - `build_request` / `parse_response` keep the I/O boundary explicit; the
//!   `Transport` trait is the only place a network is touched.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod handler;
pub mod http;
pub mod hub;
pub mod mock;
pub mod response;
pub mod service;
pub mod session;
pub mod transport;
pub mod types;

pub use auth::{AuthMock, AuthService, SessionExpired, SESSION_CHECK_INTERVAL};
pub use config::{ApiConfig, AppConfig, AuthConfig, ConfigError, Environment};
pub use error::ApiError;
pub use handler::{AppError, ErrorCategory, ErrorHandler, ErrorSeverity, NetworkErrorRecovery, RecoveryStrategy};
pub use http::{HttpMethod, HttpRequest, HttpResponse, QueryParams, QueryValue, RequestConfig};
pub use hub::Hub;
pub use mock::{EmptyResponder, MockResponder};
pub use response::{Payload, ResponseEnvelope};
pub use service::{backoff_delay, parse_response, Service, ServiceContext, ServiceSettings};
pub use session::{FileSessionStore, MemorySessionStore, SessionError, SessionStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{AuthResponse, Credentials, Role, Session, User};
