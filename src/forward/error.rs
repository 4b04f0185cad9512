//! Forwarding errors and their HTTP mapping.
//!
//! Caller misuse (4xx) is kept apart from upstream failure (5xx) so the
//! browser can tell "fix your call" from "the upstream is down".

use std::error::Error as _;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::client::TimeoutProfile;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Missing url-parameter [{0}]")]
    MissingParameter(&'static str),

    #[error("Invalid parameter [{name}]: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unsupported method [{0}]")]
    UnsupportedMethod(String),

    #[error("Cannot read file body [{path}]")]
    FileBody {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot build client for endpoint [{endpoint}]")]
    ClientBuild {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("Timeout {timeout} calling [{url}] via endpoint [{endpoint}]")]
    Timeout {
        endpoint: String,
        url: String,
        timeout: TimeoutProfile,
        source: reqwest::Error,
    },

    #[error("Error calling [{url}] via endpoint [{endpoint}]")]
    Transport {
        endpoint: String,
        url: String,
        source: reqwest::Error,
    },

    #[error("Routing task failed")]
    Routing(#[from] tokio::task::JoinError),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::MissingParameter(_)
            | ForwardError::InvalidParameter { .. }
            | ForwardError::FileBody { .. } => StatusCode::BAD_REQUEST,
            ForwardError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            ForwardError::ClientBuild { .. } | ForwardError::Routing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Transport { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// True for errors the caller caused.
    pub fn is_caller_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// The error followed by its chain of causes, one per line.
    pub fn diagnostic(&self) -> String {
        let mut text = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            text.push_str("\ncaused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_caller_error() {
            tracing::warn!(status = status.as_u16(), error = %self.diagnostic(), "Rejected call");
        } else {
            tracing::error!(status = status.as_u16(), error = %self.diagnostic(), "Forwarding failed");
        }
        (status, self.diagnostic()).into_response()
    }
}
