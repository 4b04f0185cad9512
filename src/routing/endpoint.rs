//! Upstream endpoint definition.
//!
//! # Responsibilities
//! - Hold the endpoint's selectors, headers, timeouts and metadata
//! - Own the endpoint's outbound client pool
//! - Produce the header set for an outbound call
//!
//! # Design Decisions
//! - Immutable once built; rebuilt wholesale on configuration reload
//! - Header values are validated when the endpoint is built, not per call

use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde_json::Value;
use thiserror::Error;

use crate::client::{ClientPool, ClientSettings, TimeoutProfile};
use crate::routing::matcher::{Matcher, SelectorMatcher};

/// Name of the catch-all endpoint.
pub const DEFAULT_ENDPOINT_NAME: &str = "default";

/// Errors raised while building an endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid header [{key}]: {reason}")]
    InvalidHeader { key: String, reason: String },

    #[error("cannot build outbound client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A configured (key, value) header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    pub key: String,
    pub value: String,
}

impl HeaderPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Plain data an endpoint is built from.
#[derive(Debug, Clone)]
pub struct EndpointDefinition {
    pub name: String,
    pub selectors: SelectorMatcher,
    pub timeout: TimeoutProfile,
    pub headers: Vec<HeaderPair>,
    pub client: ClientSettings,
    pub templates: Value,
    pub autocomplete: Option<String>,
    pub response_plugins: Option<String>,
}

impl EndpointDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selectors: SelectorMatcher::default(),
            timeout: TimeoutProfile::DEFAULT,
            headers: Vec::new(),
            client: ClientSettings::default(),
            templates: Value::Object(Default::default()),
            autocomplete: None,
            response_plugins: None,
        }
    }
}

/// An upstream target.
#[derive(Debug)]
pub struct Endpoint {
    name: String,
    selectors: SelectorMatcher,
    headers: HeaderMap,
    templates: Value,
    autocomplete: Option<String>,
    response_plugins: Option<String>,
    clients: ClientPool,
}

impl Endpoint {
    pub fn build(def: EndpointDefinition) -> Result<Self, EndpointError> {
        let headers = build_headers(&def.headers)?;
        let clients = ClientPool::new(def.name.clone(), def.client, def.timeout)?;
        Ok(Self {
            name: def.name,
            selectors: def.selectors,
            headers,
            templates: def.templates,
            autocomplete: def.autocomplete,
            response_plugins: def.response_plugins,
            clients,
        })
    }

    /// The catch-all endpoint: no selectors, no headers, no proxy, certificates verified.
    pub fn fallback(timeout: TimeoutProfile, templates: Value) -> Result<Self, EndpointError> {
        let mut def = EndpointDefinition::new(DEFAULT_ENDPOINT_NAME);
        def.timeout = timeout;
        def.templates = templates;
        Self::build(def)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> TimeoutProfile {
        self.clients.default_timeout()
    }

    pub fn templates(&self) -> &Value {
        &self.templates
    }

    pub fn autocomplete(&self) -> Option<&str> {
        self.autocomplete.as_deref()
    }

    pub fn response_plugins(&self) -> Option<&str> {
        self.response_plugins.as_deref()
    }

    pub fn clients(&self) -> &ClientPool {
        &self.clients
    }

    /// True if the URL matches any selector (or the endpoint has none).
    pub fn is_for_url(&self, url: &str) -> bool {
        self.selectors.matches(url)
    }

    /// Configured headers, plus `Accept: application/json` unless one is configured.
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        headers
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.clients.settings();
        write!(
            f,
            "Endpoint: [name={}, timeout={}, autocomplete={}, ignoreCertErr={}, proxy={}]",
            self.name,
            self.timeout(),
            self.autocomplete.as_deref().unwrap_or(""),
            settings.ignore_cert_errors,
            settings
                .proxy
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "None".to_string()),
        )
    }
}

fn build_headers(pairs: &[HeaderPair]) -> Result<HeaderMap, EndpointError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for pair in pairs {
        let name = HeaderName::from_bytes(pair.key.as_bytes()).map_err(|e| EndpointError::InvalidHeader {
            key: pair.key.clone(),
            reason: e.to_string(),
        })?;
        let value = HeaderValue::from_str(&pair.value).map_err(|e| EndpointError::InvalidHeader {
            key: pair.key.clone(),
            reason: e.to_string(),
        })?;
        headers.append(name, value);
    }
    Ok(headers)
}
