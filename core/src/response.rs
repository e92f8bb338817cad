//! Decoded response bodies and the envelope returned by every call.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::find_header;

/// A response body decoded according to its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl Payload {
    /// Deserialize into `T`. Text bodies deserialize as a JSON string;
    /// binary bodies never do.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
            Payload::Binary(bytes) => {
                return Err(ApiError::Deserialization(format!(
                    "cannot decode {} byte binary body",
                    bytes.len()
                )))
            }
        };
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Decoded body plus status, headers and capture time of one successful call.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<T = Payload> {
    data: T,
    status: u16,
    headers: Vec<(String, String)>,
    timestamp: DateTime<Utc>,
}

impl<T> ResponseEnvelope<T> {
    /// Capture `data` with the current time as the timestamp.
    pub fn new(data: T, status: u16, headers: Vec<(String, String)>) -> Self {
        Self {
            data,
            status,
            headers,
            timestamp: Utc::now(),
        }
    }

    /// A 200 with no headers, the usual shape of a canned mock response.
    pub fn ok(data: T) -> Self {
        Self::new(data, 200, Vec::new())
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            timestamp: self.timestamp,
        }
    }
}

impl ResponseEnvelope<Payload> {
    /// Convenience for mock responders returning JSON.
    pub fn json(data: Value) -> Self {
        Self::ok(Payload::Json(data))
    }

    /// Turn the payload into a typed value, keeping the metadata.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ResponseEnvelope<T>, ApiError> {
        let ResponseEnvelope {
            data,
            status,
            headers,
            timestamp,
        } = self;
        Ok(ResponseEnvelope {
            data: data.decode()?,
            status,
            headers,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Token {
        token: String,
    }

    #[test]
    fn decode_keeps_status_headers_and_timestamp() {
        let envelope = ResponseEnvelope::new(
            Payload::Json(json!({ "token": "t1" })),
            201,
            vec![("X-Request-Id".to_string(), "abc".to_string())],
        );
        let captured = envelope.timestamp();
        let typed: ResponseEnvelope<Token> = envelope.decode().unwrap();
        assert_eq!(typed.data().token, "t1");
        assert_eq!(typed.status(), 201);
        assert_eq!(typed.header("x-request-id"), Some("abc"));
        assert_eq!(typed.timestamp(), captured);
    }

    #[test]
    fn text_payload_decodes_as_string() {
        let text: String = Payload::Text("hello".into()).decode().unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn binary_payload_does_not_decode() {
        let err = Payload::Binary(Bytes::from_static(b"\x89PNG"))
            .decode::<Value>()
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn mismatched_shape_is_a_deserialization_error() {
        let err = Payload::Json(json!({ "nope": 1 })).decode::<Token>().unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
