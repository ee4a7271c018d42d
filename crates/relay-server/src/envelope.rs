//! JSON error envelope.
//!
//! Every failure reaches the client as HTTP 200 with
//! `{"error_code": <i32>, "error_message": <string>}` so that SSE clients
//! never have to special-case a transport status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_httpx::HttpError;
use serde_json::{Map, Value};

use crate::BridgeError;

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEnvelope {
    fields: Map<String, Value>,
}

impl ErrorEnvelope {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self::with_base(Map::new(), code, message.into())
    }

    fn with_base(mut fields: Map<String, Value>, code: i32, message: String) -> Self {
        fields.insert("error_code".into(), Value::from(code));
        fields.insert("error_message".into(), Value::String(message));
        Self { fields }
    }

    /// Envelope for an upstream failure.
    ///
    /// A `401` keeps the upstream's decoded body (an empty object when it is
    /// not JSON) with the code and message merged in. Anything else carries
    /// `"error": null`.
    pub fn from_upstream(err: &HttpError) -> Self {
        let base = match err {
            HttpError::Status {
                status: 401, body, ..
            } => body.clone().into_object_lossy(),
            _ => {
                let mut base = Map::new();
                base.insert("error".into(), Value::Null);
                base
            }
        };
        Self::with_base(base, err.code(), err.to_string())
    }

    pub fn code(&self) -> i32 {
        self.fields
            .get("error_code")
            .and_then(Value::as_i64)
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or_default()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<&BridgeError> for ErrorEnvelope {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::Upstream(e) => Self::from_upstream(e),
            other => Self::new(other.code(), other.to_string()),
        }
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.into_value())).into_response()
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        ErrorEnvelope::from(&self).into_response()
    }
}
