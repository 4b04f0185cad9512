//! Response construction for the browser front end.
//!
//! # Responsibilities
//! - Return upstream responses verbatim (status, message, bytes)
//! - Add the forwarding metadata headers (`X_endpoint`, `X_took`)
//!
//! # Design Decisions
//! - The upstream status message is passed through as the reason phrase
//! - Forwarded bodies are always labelled as JSON

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::forward::status::passthrough_phrase;
use crate::forward::ForwardOutcome;
use crate::storage::StoreError;

/// Name of the endpoint that handled a forwarded call.
pub const X_ENDPOINT: HeaderName = HeaderName::from_static("x_endpoint");

/// Milliseconds the forwarded call took.
pub const X_TOOK: HeaderName = HeaderName::from_static("x_took");

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Response for a forwarded call.
pub fn forwarded(outcome: ForwardOutcome) -> Response {
    let mut response = Response::new(Body::from(outcome.body));
    *response.status_mut() = outcome.status;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, APPLICATION_JSON);
    if let Ok(value) = HeaderValue::from_str(&outcome.endpoint) {
        headers.insert(X_ENDPOINT, value);
    }
    headers.insert(X_TOOK, HeaderValue::from(outcome.took.as_millis() as u64));

    if let Some(phrase) = passthrough_phrase(outcome.status, &outcome.message) {
        response.extensions_mut().insert(phrase);
    }
    response
}

/// `200 OK` with a JSON body.
pub fn json(bytes: impl Into<Bytes>) -> Response {
    ([(header::CONTENT_TYPE, APPLICATION_JSON)], bytes.into()).into_response()
}

/// `200 OK` with `{}`.
pub fn empty_json() -> Response {
    json(Bytes::from_static(b"{}"))
}

/// `404 Not Found` with a short text body.
pub fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("{} not found", what)).into_response()
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match self {
            StoreError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Json(_) | StoreError::InvalidName(_) | StoreError::InvalidNames => StatusCode::BAD_REQUEST,
        };
        tracing::warn!(status = status.as_u16(), error = %self, "Storage call failed");
        (status, self.to_string()).into_response()
    }
}
