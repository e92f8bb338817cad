//! Application configuration, assembled once at startup.
//!
//! Values come from `ASW_*` environment variables with per-field defaults.
//! Services copy what they need out of `AppConfig` when they are built, so a
//! config loaded later never reaches a service that already exists.

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
    Test,
}

impl Environment {
    /// Unknown names fall back to development.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Test => "test",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub mock_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub session_key: String,
    pub token_prefix: String,
    pub session_duration_hours: u32,
    pub remember_me_duration_hours: u32,
    pub allow_mock_auth: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub environment: Environment,
    pub version: String,
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Error)]
#[error("configuration validation failed:\n{}", .0.join("\n"))]
pub struct ConfigError(pub Vec<String>);

impl AppConfig {
    /// Load from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("ASW_HUB_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or_default();
        let millis = |key: &str, default: u64| {
            Duration::from_millis(lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default))
        };
        let mock_mode =
            lookup("ASW_MOCK_API").is_some_and(|v| v == "true") || environment == Environment::Development;

        Self {
            environment,
            version: lookup("ASW_HUB_VERSION").unwrap_or_else(|| "1.0.0".into()),
            api: ApiConfig {
                base_url: lookup("ASW_API_BASE_URL").unwrap_or_default(),
                timeout: millis("ASW_API_TIMEOUT_MS", 30_000),
                retry_attempts: lookup("ASW_API_RETRY_ATTEMPTS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(3),
                retry_delay: millis("ASW_API_RETRY_DELAY_MS", 1_000),
                mock_mode,
            },
            auth: AuthConfig {
                session_key: "asw-hub-session".into(),
                token_prefix: "Bearer".into(),
                session_duration_hours: 24,
                remember_me_duration_hours: 24 * 7,
                allow_mock_auth: environment != Environment::Production,
            },
        }
    }

    /// Live-mode config pointing at `base_url`, used by tests and demos.
    pub fn live(base_url: &str) -> Self {
        let mut config = Self::from_lookup(|key| match key {
            "ASW_HUB_ENV" => Some("test".into()),
            "ASW_API_BASE_URL" => Some(base_url.into()),
            _ => None,
        });
        config.api.mock_mode = false;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if !self.api.mock_mode && self.api.base_url.is_empty() {
            errors.push("API base URL is required when not in mock mode".to_string());
        }
        if self.api.timeout.is_zero() {
            errors.push("API timeout must be positive".to_string());
        }
        if self.auth.token_prefix.is_empty() {
            errors.push("auth token prefix must not be empty".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_development_in_mock_mode() {
        let config = from_map(&[]);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.api.mock_mode);
        assert_eq!(config.api.timeout, Duration::from_millis(30_000));
        assert_eq!(config.api.retry_attempts, 3);
        assert_eq!(config.api.retry_delay, Duration::from_millis(1_000));
        assert_eq!(config.auth.token_prefix, "Bearer");
        assert!(config.auth.allow_mock_auth);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn production_without_base_url_fails_validation() {
        let config = from_map(&[("ASW_HUB_ENV", "production")]);
        assert!(!config.api.mock_mode);
        assert!(!config.auth.allow_mock_auth);
        let err = config.validate().unwrap_err();
        assert_eq!(err.0, vec!["API base URL is required when not in mock mode"]);
    }

    #[test]
    fn mock_flag_enables_mock_mode_outside_development() {
        let config = from_map(&[("ASW_HUB_ENV", "staging"), ("ASW_MOCK_API", "true")]);
        assert_eq!(config.environment, Environment::Staging);
        assert!(config.api.mock_mode);
    }

    #[test]
    fn numeric_overrides_are_parsed() {
        let config = from_map(&[
            ("ASW_HUB_ENV", "test"),
            ("ASW_API_BASE_URL", "http://api.local"),
            ("ASW_API_TIMEOUT_MS", "100"),
            ("ASW_API_RETRY_ATTEMPTS", "0"),
            ("ASW_API_RETRY_DELAY_MS", "25"),
        ]);
        assert_eq!(config.api.timeout, Duration::from_millis(100));
        assert_eq!(config.api.retry_attempts, 0);
        assert_eq!(config.api.retry_delay, Duration::from_millis(25));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let config = from_map(&[("ASW_API_TIMEOUT_MS", "soon"), ("ASW_API_RETRY_ATTEMPTS", "-1")]);
        assert_eq!(config.api.timeout, Duration::from_millis(30_000));
        assert_eq!(config.api.retry_attempts, 3);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = from_map(&[("ASW_API_TIMEOUT_MS", "0")]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API timeout must be positive"));
    }

    #[test]
    fn live_config_disables_mock_mode() {
        let config = AppConfig::live("http://127.0.0.1:9");
        assert!(!config.api.mock_mode);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9");
        assert_eq!(config.environment, Environment::Test);
    }
}
