//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from the settings file.
//! Timespans are kept as strings here and parsed during validation.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Verbose per-call logging (endpoint choice, outbound headers).
    pub debug: bool,

    /// Inbound listener settings.
    pub server: ServerConfig,

    /// Save-set storage settings.
    pub storage: StorageConfig,

    /// Template collection settings.
    pub templates: TemplatesConfig,

    /// Registry-wide default timeouts.
    pub timeouts: TimeoutConfig,

    /// Named header sets endpoints can refer to.
    pub header_collections: Vec<HeaderCollectionConfig>,

    /// Upstream endpoints, in selection order.
    pub endpoints: Vec<EndpointConfig>,

    /// Host-name rewrite rules, in evaluation order.
    pub resolvers: Vec<ResolverRuleConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:4444").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4444".to_string(),
        }
    }
}

/// Save-set storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage directory, relative to the settings file.
    pub dir: String,

    /// Delay between the last save and the write to disk. Bare numbers are seconds.
    pub lazy_interval: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: "storage".to_string(),
            lazy_interval: "5m".to_string(),
        }
    }
}

/// Template collection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Template directory, relative to the settings file.
    pub dir: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: "templates".to_string(),
        }
    }
}

/// Timeout overrides. Bare numbers are milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Call timeout (total time for request/response).
    pub timeout: Option<String>,

    /// Connection establishment timeout.
    pub connect_timeout: Option<String>,
}

/// A named, reusable set of headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderCollectionConfig {
    pub name: String,

    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
}

/// A single header.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderConfig {
    pub key: String,
    pub value: String,
}

/// Upstream endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Endpoint identifier, reported back to the browser.
    pub name: String,

    /// URL patterns (case-insensitive, "contains" semantics). Empty = match all.
    #[serde(default)]
    pub selectors: Vec<String>,

    /// Call timeout override.
    pub timeout: Option<String>,

    /// Connect timeout override.
    pub connect_timeout: Option<String>,

    /// Header collection to attach.
    pub headers: Option<String>,

    /// Skip certificate and host-name verification.
    #[serde(default)]
    pub ignore_certificate_errors: bool,

    /// Template collections to bind ("*" = all).
    #[serde(default = "default_all")]
    pub templates: String,

    /// Autocomplete processor name.
    pub autocomplete: Option<String>,

    /// Response plugin expression.
    #[serde(default = "default_all")]
    pub response_plugins: String,

    /// Optional upstream proxy.
    pub proxy: Option<ProxyConfig>,
}

fn default_all() -> String {
    "*".to_string()
}

/// Proxy kind as written in the settings file.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Socks,
}

/// Upstream proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    #[serde(rename = "type", default)]
    pub kind: ProxyType,
    pub addr: String,
    pub port: u16,
}

/// One resolver rule. Exactly one of `suffixes`, `value` and `replace` must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverRuleConfig {
    /// Trigger pattern.
    pub expr: String,

    /// Suffixes to probe, in order.
    pub suffixes: Option<Vec<String>>,

    /// Literal replacement host.
    pub value: Option<String>,

    /// Replacement template with `$1`-style back-references.
    pub replace: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
