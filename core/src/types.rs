//! Domain DTOs for the auth API.
//!
//! # Design
//! Field names follow the API's camelCase JSON. The mock server defines its
//! own copies of the wire shapes; the live integration tests catch drift
//! between the two crates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Developer,
    Viewer,
}

/// A hub user as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Login form input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body returned by login, OAuth and refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// A persisted login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
}

impl Session {
    pub fn new(user: User, token: String, lifetime: Duration, remember_me: bool) -> Self {
        Self {
            user,
            token,
            expires_at: Utc::now() + lifetime,
            remember_me,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_reads_camel_case() {
        let raw = r#"{
            "user": {"id":"u1","username":"sarah.chen","email":"sarah.chen@aswtech.com",
                     "name":"Sarah Chen","role":"admin","githubUsername":"sarahchen"},
            "token": "t1",
            "expiresIn": 3600
        }"#;
        let response: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.token, "t1");
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.user.role, Role::Admin);
        assert_eq!(response.user.github_username.as_deref(), Some("sarahchen"));
        assert!(response.refresh_token.is_none());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let raw = r#"{"id":"u1","username":"x","email":"x@y.z","name":"X","role":"owner"}"#;
        assert!(serde_json::from_str::<User>(raw).is_err());
    }

    #[test]
    fn session_expiry_is_strictly_after_deadline() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","username":"x","email":"x@y.z","name":"X","role":"viewer"}"#,
        )
        .unwrap();
        let session = Session::new(user, "t".into(), Duration::hours(1), false);
        assert!(!session.is_expired_at(session.expires_at));
        assert!(session.is_expired_at(session.expires_at + Duration::seconds(1)));
        assert!(!session.is_expired());
    }
}
