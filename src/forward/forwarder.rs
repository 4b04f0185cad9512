//! Single-call forwarding.
//!
//! # Data Flow
//! ```text
//! forward(method, url, body)
//!     → url.rs: strip c_timeout, remember override
//!     → blocking pool: current snapshot → resolve host → select endpoint
//!     → endpoint client pool: client for the effective timeout profile
//!     → body.rs: GET/HEAD none, file directive, JSON media type
//!     → dispatch, read full body
//!     → ForwardOutcome { status, message, bytes }
//! ```
//!
//! # Design Decisions
//! - No retries and no response caching
//! - Timeouts are enforced by the outbound client, not here
//! - Host lookups may block, so routing runs on the blocking pool

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use hyper::ext::ReasonPhrase;
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};

use crate::config::{GatewaySnapshot, ReloadGate};
use crate::forward::body::prepare_body;
use crate::forward::error::ForwardError;
use crate::forward::status::status_message;
use crate::forward::url::extract_timeout_override;
use crate::observability::metrics;
use crate::routing::Endpoint;

/// Result of one forwarded call.
#[derive(Debug, Clone)]
pub struct ForwardOutcome {
    pub endpoint: String,
    pub status: StatusCode,
    pub message: String,
    pub body: Bytes,
    pub took: Duration,
}

/// Where a URL goes under the current configuration.
#[derive(Debug, Clone)]
pub struct Route {
    pub snapshot: Arc<GatewaySnapshot>,
    pub url: String,
    pub endpoint: Arc<Endpoint>,
}

/// Forwards calls using whatever configuration the reload gate holds.
#[derive(Debug, Clone)]
pub struct Forwarder {
    gate: Arc<ReloadGate>,
}

impl Forwarder {
    pub fn new(gate: Arc<ReloadGate>) -> Self {
        Self { gate }
    }

    /// Resolve the host of `url` and select its endpoint.
    pub async fn route(&self, url: String) -> Result<Route, ForwardError> {
        let gate = self.gate.clone();
        let route = tokio::task::spawn_blocking(move || {
            let snapshot = gate.current();
            let url = snapshot.resolver.resolve_url(&url);
            let endpoint = snapshot.registry.select_for(&url);
            Route {
                snapshot,
                url,
                endpoint,
            }
        })
        .await?;

        if route.snapshot.debug {
            tracing::info!(endpoint = %route.endpoint.name(), url = %route.url, "Endpoint selected");
        } else {
            tracing::debug!(endpoint = %route.endpoint.name(), url = %route.url, "Endpoint selected");
        }
        Ok(route)
    }

    /// Forward one call and return the upstream response.
    pub async fn forward(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<ForwardOutcome, ForwardError> {
        let start = Instant::now();
        if url.trim().is_empty() {
            return Err(ForwardError::MissingParameter("url"));
        }

        let (url, override_millis) = extract_timeout_override(url.trim())?;
        let route = self.route(url).await?;
        let endpoint = route.endpoint.clone();

        let result = dispatch(&route, method, override_millis, body).await;
        match &result {
            Ok(reply) => metrics::record_forward(endpoint.name(), reply.status.as_u16(), start),
            Err(e) if !e.is_caller_error() => metrics::record_forward(endpoint.name(), 0, start),
            Err(_) => {}
        }
        result.map(|reply| ForwardOutcome {
            endpoint: endpoint.name().to_string(),
            status: reply.status,
            message: reply.message,
            body: reply.body,
            took: start.elapsed(),
        })
    }
}

/// What the upstream answered.
struct UpstreamReply {
    status: StatusCode,
    message: String,
    body: Bytes,
}

async fn dispatch(
    route: &Route,
    method: Method,
    override_millis: Option<u64>,
    body: Option<Bytes>,
) -> Result<UpstreamReply, ForwardError> {
    let endpoint = &route.endpoint;
    let url = &route.url;

    ::url::Url::parse(url).map_err(|e| ForwardError::InvalidParameter {
        name: "url".to_string(),
        reason: format!("[{}] {}", url, e),
    })?;

    let timeout = match override_millis {
        Some(millis) => endpoint.timeout().with_call(millis),
        None => endpoint.timeout(),
    };
    let client = endpoint
        .clients()
        .client_for(timeout)
        .map_err(|source| ForwardError::ClientBuild {
            endpoint: endpoint.name().to_string(),
            source,
        })?;

    let mut headers = endpoint.request_headers();
    let body = prepare_body(&method, body).await?;
    if let Some(body) = &body {
        if let Ok(value) = HeaderValue::from_str(&body.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        if method != Method::DELETE {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.bytes.len()));
        }
    }

    if route.snapshot.debug {
        tracing::info!(method = %method, url = %url, timeout = %timeout, "Forwarding");
        for (key, value) in headers.iter() {
            tracing::info!(header = %key, value = ?value, "Outbound header");
        }
    }

    let mut request = client.http().request(method, url.as_str()).headers(headers);
    if let Some(body) = body {
        request = request.body(body.bytes);
    }

    let transport_error = |source: reqwest::Error| {
        if source.is_timeout() {
            ForwardError::Timeout {
                endpoint: endpoint.name().to_string(),
                url: url.clone(),
                timeout,
                source,
            }
        } else {
            ForwardError::Transport {
                endpoint: endpoint.name().to_string(),
                url: url.clone(),
                source,
            }
        }
    };

    let response = request.send().await.map_err(&transport_error)?;
    let status = response.status();
    let message = status_message(status, response.extensions().get::<ReasonPhrase>());
    let bytes = response.bytes().await.map_err(&transport_error)?;

    tracing::debug!(
        endpoint = %endpoint.name(),
        status = status.as_u16(),
        bytes = bytes.len(),
        "Upstream responded"
    );
    Ok(UpstreamReply {
        status,
        message,
        body: bytes,
    })
}
