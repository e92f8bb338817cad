//! In-memory stand-in for the A-SW Hub backend.
//!
//! Serves the auth endpoints under `/api/auth` plus a handful of `/diag`
//! routes that misbehave on purpose (fixed statuses, flaky failures, slow
//! replies, echo) so the client's retry and parsing paths can be exercised
//! over real HTTP.

mod auth;
mod diag;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    routing::{any, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_in: u64,
}

/// Email and password of the seeded demo account.
pub const DEMO_EMAIL: &str = "sarah.chen@aswtech.com";
pub const DEMO_PASSWORD: &str = "harvest-2026";

#[derive(Debug, Default)]
pub struct Db {
    pub users: HashMap<String, (String, User)>,
    pub tokens: HashSet<String>,
    pub hits: HashMap<String, u64>,
}

pub type SharedDb = Arc<RwLock<Db>>;

fn seeded() -> Db {
    let mut db = Db::default();
    db.users.insert(
        DEMO_EMAIL.to_string(),
        (
            DEMO_PASSWORD.to_string(),
            User {
                id: "usr-sarah".to_string(),
                username: "sarah.chen".to_string(),
                email: DEMO_EMAIL.to_string(),
                name: "Sarah Chen".to_string(),
                role: "admin".to_string(),
                github_username: Some("sarahchen".to_string()),
            },
        ),
    );
    db
}

pub fn app() -> Router {
    app_with_db(seeded_db())
}

/// Same routes over a caller-held database, so tests can inspect it.
pub fn app_with_db(db: SharedDb) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/oauth/github", get(auth::oauth_github))
        .route("/diag/status/{code}", any(diag::status))
        .route("/diag/hits/{key}", get(diag::hits))
        .route("/diag/flaky/{failures}", any(diag::flaky))
        .route("/diag/echo", any(diag::echo))
        .route("/diag/text", get(diag::text))
        .route("/diag/binary", get(diag::binary))
        .route("/diag/slow/{ms}", get(diag::slow))
        .with_state(db)
}

pub fn seeded_db() -> SharedDb {
    Arc::new(RwLock::new(seeded()))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_db(listener, seeded_db()).await
}

pub async fn run_with_db(listener: TcpListener, db: SharedDb) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_db(db)).await
}
