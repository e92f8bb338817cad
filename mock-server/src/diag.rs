use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::SharedDb;

async fn hit(db: &SharedDb, key: String) -> u64 {
    let mut db = db.write().await;
    let count = db.hits.entry(key).or_insert(0);
    *count += 1;
    *count
}

/// Always answers with `code`, counting each hit under `status-<code>`.
pub async fn status(State(db): State<SharedDb>, Path(code): Path<u16>) -> impl IntoResponse {
    hit(&db, format!("status-{code}")).await;
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "status": code })))
}

pub async fn hits(State(db): State<SharedDb>, Path(key): Path<String>) -> Json<Value> {
    let count = db.read().await.hits.get(&key).copied().unwrap_or(0);
    Json(json!({ "key": key, "hits": count }))
}

/// 503 for the first `failures` hits, then 200 with the attempt number.
pub async fn flaky(State(db): State<SharedDb>, Path(failures): Path<u64>) -> impl IntoResponse {
    let count = hit(&db, format!("flaky-{failures}")).await;
    if count <= failures {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "attempt": count })))
    } else {
        (StatusCode::OK, Json(json!({ "attempt": count })))
    }
}

/// Reflects method, query, auth and content headers, and the JSON body.
pub async fn echo(
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let read = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "authorization": read(header::AUTHORIZATION),
        "contentType": read(header::CONTENT_TYPE),
        "accept": read(header::ACCEPT),
        "body": body,
    }))
}

pub async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], "year,milestone\n2026,field trials\n")
}

pub async fn binary() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Bytes::from_static(&[0x25, 0x50, 0x44, 0x46, 0x00, 0xff]),
    )
}

pub async fn slow(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "delayedMs": ms }))
}
