use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{AuthResponse, SharedDb, User, DEMO_EMAIL};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

fn issue(db: &mut crate::Db, user: User, remember_me: bool) -> AuthResponse {
    let token = Uuid::new_v4().to_string();
    db.tokens.insert(token.clone());
    AuthResponse {
        user,
        token,
        expires_in: if remember_me { 7 * 24 * 3600 } else { 3600 },
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub async fn login(
    State(db): State<SharedDb>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let mut db = db.write().await;
    let user = match db.users.get(&input.email) {
        Some((password, user)) if *password == input.password => user.clone(),
        _ => {
            tracing::info!(email = %input.email, "rejected login");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    Ok(Json(issue(&mut db, user, input.remember_me)))
}

pub async fn oauth_github(State(db): State<SharedDb>) -> Result<Json<AuthResponse>, StatusCode> {
    let mut db = db.write().await;
    let user = db
        .users
        .get(DEMO_EMAIL)
        .map(|(_, user)| user.clone())
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(issue(&mut db, user, true)))
}

pub async fn logout(State(db): State<SharedDb>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer(&headers) {
        db.write().await.tokens.remove(token);
    }
    Json(json!({ "success": true }))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

pub async fn refresh(
    State(db): State<SharedDb>,
    Json(input): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let mut db = db.write().await;
    if !db.tokens.remove(&input.token) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let user = db
        .users
        .get(DEMO_EMAIL)
        .map(|(_, user)| user.clone())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(issue(&mut db, user, false)))
}
