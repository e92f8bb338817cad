//! Process-wide error handler: classification, listeners, logging and
//! recovery bookkeeping.
//!
//! # Design
//! The executor hands its final error to `ErrorHandler::report`, which
//! classifies and logs synchronously and evaluates recovery strategies on a
//! spawned task, so a failing call is never held up by recovery delays.
//! `handle` runs the same steps inline for callers that want to wait.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Validation,
    Authentication,
    Authorization,
    BusinessLogic,
    System,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::BusinessLogic => "business_logic",
            ErrorCategory::System => "system",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified error as seen by listeners and recovery strategies.
#[derive(Debug, Clone)]
pub struct AppError {
    pub id: Uuid,
    pub code: String,
    pub message: String,
    pub severity: ErrorSeverity,
    pub category: ErrorCategory,
    pub recoverable: bool,
    pub status: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl AppError {
    fn new(code: String, message: String, severity: ErrorSeverity, category: ErrorCategory, recoverable: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            message,
            severity,
            category,
            recoverable,
            status: None,
            timestamp: Utc::now(),
        }
    }

    pub fn classify(error: &ApiError) -> Self {
        let message = error.to_string();
        match error {
            ApiError::Http { .. } | ApiError::Timeout { .. } | ApiError::Transport(_) => {
                let status = error.status();
                let code = match status {
                    Some(status) => format!("NETWORK_{status}"),
                    None => "NETWORK_UNKNOWN".to_string(),
                };
                let severity = if status == Some(503) {
                    ErrorSeverity::High
                } else {
                    ErrorSeverity::Medium
                };
                let mut app = Self::new(code, message, severity, ErrorCategory::Network, true);
                app.status = status;
                app
            }
            ApiError::Validation { .. } => Self::new(
                "VALIDATION_ERROR".into(),
                message,
                ErrorSeverity::Low,
                ErrorCategory::Validation,
                true,
            ),
            ApiError::Authentication(_) => Self::new(
                "AUTH_FAILED".into(),
                message,
                ErrorSeverity::High,
                ErrorCategory::Authentication,
                true,
            ),
            ApiError::Serialization(_) | ApiError::Deserialization(_) | ApiError::Config(_) => Self::new(
                "SYSTEM_ERROR".into(),
                message,
                ErrorSeverity::Critical,
                ErrorCategory::System,
                false,
            ),
        }
    }

    /// Text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self.category {
            ErrorCategory::Network => match self.status {
                Some(404) => "The requested resource was not found".into(),
                Some(500) => "A server error occurred. Please try again later".into(),
                Some(503) => "Service temporarily unavailable. Please try again later".into(),
                _ => "A network error occurred. Please check your connection".into(),
            },
            ErrorCategory::Authentication => "Please log in to continue".into(),
            ErrorCategory::Authorization => "You do not have permission to perform this action".into(),
            ErrorCategory::System => "A system error occurred. Please contact support if this persists".into(),
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn can_recover(&self, error: &AppError) -> bool;

    async fn recover(&self, error: &AppError) -> Result<(), AppError>;
}

/// Backs off before letting a network error be treated as recovered, at most
/// `max_recoveries` times per error id.
#[derive(Debug)]
pub struct NetworkErrorRecovery {
    counts: Mutex<VecDeque<(Uuid, u32)>>,
    max_recoveries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

const TRACKED_ERRORS: usize = 100;

impl Default for NetworkErrorRecovery {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(10))
    }
}

impl NetworkErrorRecovery {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            counts: Mutex::new(VecDeque::new()),
            max_recoveries: 3,
            base_delay,
            max_delay,
        }
    }

    pub fn attempts(&self, id: Uuid) -> u32 {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.iter().find(|(k, _)| *k == id).map_or(0, |(_, n)| *n)
    }

    pub fn tracked(&self) -> usize {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn bump(&self, id: Uuid) -> u32 {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = counts.iter_mut().find(|(k, _)| *k == id) {
            let previous = entry.1;
            entry.1 += 1;
            return previous;
        }
        counts.push_back((id, 1));
        while counts.len() > TRACKED_ERRORS {
            counts.pop_front();
        }
        0
    }

    fn delay_for(&self, previous: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(previous))
            .min(self.max_delay)
    }
}

#[async_trait]
impl RecoveryStrategy for NetworkErrorRecovery {
    fn can_recover(&self, error: &AppError) -> bool {
        error.category == ErrorCategory::Network
            && error.recoverable
            && self.attempts(error.id) < self.max_recoveries
    }

    async fn recover(&self, error: &AppError) -> Result<(), AppError> {
        let previous = self.bump(error.id);
        tokio::time::sleep(self.delay_for(previous)).await;
        Ok(())
    }
}

type Listener = Arc<dyn Fn(&AppError) + Send + Sync>;

/// Shared across all services; construct once and pass around as `Arc`.
pub struct ErrorHandler {
    strategies: RwLock<Vec<Arc<dyn RecoveryStrategy>>>,
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_listener: Mutex<u64>,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        let handler = Self::empty();
        handler.register_strategy(Arc::new(NetworkErrorRecovery::default()));
        handler
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("strategies", &self.strategies.read().unwrap_or_else(PoisonError::into_inner).len())
            .field("listeners", &self.listeners.read().unwrap_or_else(PoisonError::into_inner).len())
            .finish()
    }
}

impl ErrorHandler {
    /// A handler with no recovery strategies registered.
    pub fn empty() -> Self {
        Self {
            strategies: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: Mutex::new(0),
        }
    }

    pub fn register_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        self.strategies.write().unwrap_or_else(PoisonError::into_inner).push(strategy);
    }

    /// Returns an id for `remove_listener`.
    pub fn on_error(&self, listener: impl Fn(&AppError) + Send + Sync + 'static) -> u64 {
        let mut next = self.next_listener.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next;
        *next += 1;
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(k, _)| *k != id);
        listeners.len() != before
    }

    /// Classify, notify and log now; evaluate recovery in the background.
    pub fn report(self: &Arc<Self>, error: &ApiError) -> AppError {
        let app = AppError::classify(error);
        self.observe(&app);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let handler = Arc::clone(self);
                let background = app.clone();
                runtime.spawn(async move {
                    if let Err(e) = handler.recover(&background).await {
                        tracing::debug!(error = %e, "no recovery for reported error");
                    }
                });
            }
            Err(_) => tracing::debug!(id = %app.id, "no runtime, skipping recovery"),
        }
        app
    }

    /// Classify, notify, log and run recovery inline. Fails with the error
    /// itself when no strategy recovered it and it is not recoverable.
    pub async fn handle(&self, error: AppError) -> Result<(), AppError> {
        self.observe(&error);
        self.recover(&error).await
    }

    fn observe(&self, error: &AppError) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(error);
        }
        log_error(error);
    }

    async fn recover(&self, error: &AppError) -> Result<(), AppError> {
        let strategies: Vec<Arc<dyn RecoveryStrategy>> = self
            .strategies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for strategy in strategies {
            if strategy.can_recover(error) {
                match strategy.recover(error).await {
                    Ok(()) => return Ok(()),
                    Err(e) => tracing::error!(error = %e, "recovery failed"),
                }
            }
        }
        if error.recoverable {
            Ok(())
        } else {
            Err(error.clone())
        }
    }
}

fn log_error(error: &AppError) {
    let (id, code, category) = (error.id, error.code.as_str(), error.category);
    match error.severity {
        ErrorSeverity::Critical => {
            tracing::error!(%id, code, %category, "critical error: {}", error.message)
        }
        ErrorSeverity::High => tracing::error!(%id, code, %category, "{}", error.message),
        ErrorSeverity::Medium => tracing::warn!(%id, code, %category, "{}", error.message),
        ErrorSeverity::Low => tracing::info!(%id, code, %category, "{}", error.message),
    }
}
