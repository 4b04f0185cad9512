//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, body limit)
//! - Bind server to listener and stop on shutdown
//! - Hand `/service` calls to the Forwarder
//! - Serve endpoint metadata and save-set storage

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, Method, Request},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::forward::{ForwardError, Forwarder};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response;
use crate::storage::{SaveSetStore, StoreError};

/// Largest inbound body accepted (bulk payloads and save sets).
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
    pub store: Arc<dyn SaveSetStore>,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/service", any(service_handler))
            .route("/endpoint_type", get(endpoint_type_handler))
            .route("/storage/initial_state", get(initial_state_handler))
            .route(
                "/storage/saveset/{name}",
                get(load_saveset_handler).post(save_saveset_handler),
            )
            .route("/storage/names", post(save_names_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request.headers().request_id(),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// The router, for serving it some other way (tests).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UrlParams {
    url: Option<String>,
}

impl UrlParams {
    fn required(self) -> Result<String, ForwardError> {
        self.url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ForwardError::MissingParameter("url"))
    }
}

/// Forward one browser call to its upstream.
async fn service_handler(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ForwardError> {
    let url = params.required()?;
    tracing::debug!(request_id = %headers.request_id(), method = %method, url = %url, "Forwarding call");

    let body = (!body.is_empty()).then_some(body);
    let outcome = state.forwarder.forward(method, &url, body).await?;
    tracing::debug!(
        request_id = %headers.request_id(),
        status = outcome.status.as_u16(),
        bytes = outcome.body.len(),
        took_ms = outcome.took.as_millis() as u64,
        "Call forwarded"
    );
    Ok(response::forwarded(outcome))
}

/// Endpoint metadata for a URL: name, autocomplete, templates, response plugins.
async fn endpoint_type_handler(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<Response, ForwardError> {
    let url = params.required()?;
    let route = state.forwarder.route(url).await?;
    let endpoint = &route.endpoint;
    Ok(Json(json!({
        "endpoint": endpoint.name(),
        "autocomplete": endpoint.autocomplete(),
        "templates": endpoint.templates(),
        "responsePluginsExpr": endpoint.response_plugins(),
    }))
    .into_response())
}

async fn initial_state_handler(State(state): State<AppState>) -> Result<Response, StoreError> {
    let initial = state.store.initial_state()?;
    Ok(Json(initial).into_response())
}

async fn load_saveset_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, StoreError> {
    Ok(match state.store.load(&name)? {
        Some(bytes) => response::json(bytes),
        None => response::not_found(&format!("save set [{}]", name)),
    })
}

async fn save_saveset_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, StoreError> {
    state.store.save(&name, body)?;
    Ok(response::empty_json())
}

async fn save_names_handler(State(state): State<AppState>, body: Bytes) -> Result<Response, StoreError> {
    state.store.save_names(body)?;
    Ok(response::empty_json())
}
