//! Login, logout and session lifecycle on top of the `/api/auth` endpoints.
//!
//! Starting a session also starts a background check that runs every
//! `SESSION_CHECK_INTERVAL` and broadcasts `SessionExpired` once the stored
//! session is gone. Logout stops it.

mod mock;

pub use mock::AuthMock;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::http::QueryParams;
use crate::mock::MockResponder;
use crate::service::{Service, ServiceContext};
use crate::session::SessionStore;
use crate::types::{AuthResponse, Credentials, Session, User};

const EMAIL_MAX: usize = 255;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;

/// How often a running session is checked for expiry.
pub const SESSION_CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Broadcast when a monitored session is found missing or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpired;

pub struct AuthService {
    service: Service,
    sessions: Arc<dyn SessionStore>,
    config: AuthConfig,
    expired: broadcast::Sender<SessionExpired>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("monitoring", &self.is_monitoring())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(context: &ServiceContext) -> Self {
        Self::with_responder(context, Arc::new(AuthMock::default()))
    }

    pub fn with_responder(context: &ServiceContext, responder: Arc<dyn MockResponder>) -> Self {
        Self {
            service: Service::new("AuthService", Some("/api/auth"), context, responder),
            sessions: Arc::clone(&context.sessions),
            config: context.config.auth.clone(),
            expired: broadcast::channel(8).0,
            monitor: Mutex::new(None),
        }
    }

    /// Notified once each time a monitored session runs out.
    pub fn subscribe_expired(&self) -> broadcast::Receiver<SessionExpired> {
        self.expired.subscribe()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Validate `credentials`, authenticate, and persist the new session.
    pub async fn login(&self, credentials: &Credentials, remember_me: bool) -> Result<AuthResponse, ApiError> {
        validate_credentials(credentials)?;
        let email = credentials.email.trim();
        tracing::info!(email, mock_mode = self.service.is_mock(), "login attempt");

        let body = json!({
            "email": email,
            "password": credentials.password,
            "rememberMe": remember_me,
        });
        let response = match self
            .service
            .post::<AuthResponse>("/login", Some(body), QueryParams::new())
            .await
        {
            Ok(envelope) => envelope.into_data(),
            Err(err) => {
                tracing::error!(email, error = %err, "login failed");
                return Err(ApiError::Authentication("Invalid credentials".into()));
            }
        };
        if response.token.is_empty() {
            return Err(ApiError::Authentication(
                "Invalid response from authentication service".into(),
            ));
        }

        self.start_session(response.user.clone(), response.token.clone(), remember_me);
        Ok(response)
    }

    pub async fn login_with_github(&self) -> Result<AuthResponse, ApiError> {
        let response = self
            .service
            .get::<AuthResponse>("/oauth/github", QueryParams::new())
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "github login failed");
                ApiError::Authentication("GitHub authentication failed".into())
            })?
            .into_data();
        self.start_session(response.user.clone(), response.token.clone(), true);
        Ok(response)
    }

    /// Tell the server (live mode only) and always drop the local session.
    pub async fn logout(&self) {
        if !self.service.is_mock() {
            if let Err(err) = self
                .service
                .post::<serde_json::Value>("/logout", None, QueryParams::new())
                .await
            {
                tracing::error!(error = %err, "server logout failed");
            }
        }
        self.stop_monitoring();
        self.sessions.clear();
    }

    /// The current session; an expired one is cleared and reads as `None`.
    pub fn session(&self) -> Option<Session> {
        live_session(self.sessions.as_ref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        let session = self
            .session()
            .ok_or_else(|| ApiError::Authentication("No active session".into()))?;

        let result = self
            .service
            .post::<AuthResponse>("/refresh", Some(json!({ "token": session.token })), QueryParams::new())
            .await;
        match result {
            Ok(envelope) => {
                let response = envelope.into_data();
                self.start_session(response.user, response.token, session.remember_me);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "session refresh failed");
                self.sessions.clear();
                Err(ApiError::Authentication("Session refresh failed".into()))
            }
        }
    }

    /// Push the current session's expiry out by a full lifetime.
    pub fn extend_session(&self) {
        let Some(mut session) = self.session() else {
            return;
        };
        session.expires_at = Utc::now() + self.lifetime(session.remember_me);
        self.persist(&session);
    }

    fn lifetime(&self, remember_me: bool) -> Duration {
        let hours = if remember_me {
            self.config.remember_me_duration_hours
        } else {
            self.config.session_duration_hours
        };
        Duration::hours(i64::from(hours))
    }

    fn start_session(&self, user: User, token: String, remember_me: bool) {
        let session = Session::new(user, token, self.lifetime(remember_me), remember_me);
        self.persist(&session);
        self.start_monitoring();
    }

    /// Replace any running monitor with a fresh one.
    fn start_monitoring(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, session monitoring disabled");
            return;
        };
        let task = runtime.spawn(watch_session(Arc::clone(&self.sessions), self.expired.clone()));
        if let Some(previous) = self.monitor.lock().unwrap_or_else(PoisonError::into_inner).replace(task) {
            previous.abort();
        }
    }

    fn stop_monitoring(&self) {
        if let Some(task) = self.monitor.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.sessions.persist(session) {
            tracing::error!(error = %e, "failed to persist session");
        }
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

/// The stored session, clearing it first if it has expired.
fn live_session(sessions: &dyn SessionStore) -> Option<Session> {
    let session = sessions.load()?;
    if session.is_expired() {
        tracing::info!(user = %session.user.username, "session expired");
        sessions.clear();
        return None;
    }
    Some(session)
}

/// Checks the session every `SESSION_CHECK_INTERVAL` and announces its end once.
async fn watch_session(sessions: Arc<dyn SessionStore>, expired: broadcast::Sender<SessionExpired>) {
    let mut ticks = interval_at(Instant::now() + SESSION_CHECK_INTERVAL, SESSION_CHECK_INTERVAL);
    loop {
        ticks.tick().await;
        if live_session(sessions.as_ref()).is_none() {
            tracing::info!("monitored session ended");
            // No subscribers is fine.
            let _ = expired.send(SessionExpired);
            return;
        }
    }
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), ApiError> {
    let email = credentials.email.trim();
    if email.is_empty() {
        return Err(ApiError::validation("email", "Email is required"));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(ApiError::validation("email", "Email is too long"));
    }
    if !looks_like_email(email) {
        return Err(ApiError::validation("email", "Invalid email format"));
    }

    let password = &credentials.password;
    if password.is_empty() {
        return Err(ApiError::validation("password", "Password is required"));
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(ApiError::validation("password", "Password must be at least 8 characters"));
    }
    if password.chars().count() > PASSWORD_MAX {
        return Err(ApiError::validation("password", "Password is too long"));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
