use asw_hub_mock_server::{app, app_with_db, seeded_db, AuthResponse, DEMO_EMAIL, DEMO_PASSWORD};
use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn login_body(email: &str, password: &str) -> String {
    serde_json::json!({ "email": email, "password": password }).to_string()
}

// --- auth ---

#[tokio::test]
async fn login_with_demo_account_issues_token() {
    let resp = app()
        .oneshot(json_request("POST", "/api/auth/login", &login_body(DEMO_EMAIL, DEMO_PASSWORD)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let auth: AuthResponse = body_json(resp).await;
    assert_eq!(auth.user.email, DEMO_EMAIL);
    assert_eq!(auth.expires_in, 3600);
    assert!(!auth.token.is_empty());
}

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let resp = app()
        .oneshot(json_request("POST", "/api/auth/login", &login_body(DEMO_EMAIL, "wrong-password")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_malformed_body_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/auth/login", r#"{"email":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn refresh_with_unknown_token_returns_401() {
    let resp = app()
        .oneshot(json_request("POST", "/api/auth/refresh", r#"{"token":"nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // login
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/auth/login", &login_body(DEMO_EMAIL, DEMO_PASSWORD)))
        .await
        .unwrap();
    let first: AuthResponse = body_json(resp).await;

    // refresh rotates the token
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/auth/refresh",
            &format!(r#"{{"token":"{}"}}"#, first.token),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let second: AuthResponse = body_json(resp).await;
    assert_ne!(second.token, first.token);

    // the old token is spent
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/auth/refresh",
            &format!(r#"{{"token":"{}"}}"#, first.token),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // logout revokes the current token
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(http::header::AUTHORIZATION, format!("Bearer {}", second.token))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], true);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/auth/refresh",
            &format!(r#"{{"token":"{}"}}"#, second.token),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token_in_the_database() {
    let db = seeded_db();

    let resp = app_with_db(db.clone())
        .oneshot(json_request("POST", "/api/auth/login", &login_body(DEMO_EMAIL, DEMO_PASSWORD)))
        .await
        .unwrap();
    let auth: AuthResponse = body_json(resp).await;
    assert!(db.read().await.tokens.contains(&auth.token));

    let resp = app_with_db(db.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(http::header::AUTHORIZATION, format!("Bearer {}", auth.token))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(db.read().await.tokens.is_empty());
}

#[tokio::test]
async fn github_oauth_remembers_for_a_week() {
    let resp = app().oneshot(get("/api/auth/oauth/github")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let auth: AuthResponse = body_json(resp).await;
    assert_eq!(auth.expires_in, 7 * 24 * 3600);
}

// --- diag ---

#[tokio::test]
async fn status_route_answers_with_requested_code_and_counts() {
    use tower::Service;

    let mut app = app().into_service();

    for _ in 0..2 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get("/diag/status/503"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/diag/hits/status-503"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["hits"], 2);
}

#[tokio::test]
async fn flaky_route_recovers_after_failures() {
    use tower::Service;

    let mut app = app().into_service();
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get("/diag/flaky/2"))
            .await
            .unwrap();
        statuses.push(resp.status());
    }

    assert_eq!(
        statuses,
        vec![StatusCode::SERVICE_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE, StatusCode::OK]
    );
}

#[tokio::test]
async fn echo_reflects_method_query_and_body() {
    let resp = app()
        .oneshot(json_request("PATCH", "/diag/echo?season=spring&plot=7", r#"{"crop":"barley"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["method"], "PATCH");
    assert_eq!(body["query"]["season"], "spring");
    assert_eq!(body["query"]["plot"], "7");
    assert_eq!(body["body"]["crop"], "barley");
    assert_eq!(body["contentType"], "application/json");
    assert!(body["authorization"].is_null());
}

#[tokio::test]
async fn text_and_binary_routes_declare_content_types() {
    let resp = app().oneshot(get("/diag/text")).await.unwrap();
    assert!(resp.headers()[http::header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"year,milestone"));

    let resp = app().oneshot(get("/diag/binary")).await.unwrap();
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/octet-stream");
    let body = body_bytes(resp).await;
    assert_eq!(&body[..4], b"%PDF");
}
