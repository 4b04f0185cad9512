//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (endpoints reference existing header collections)
//! - Check every pattern and timespan parses
//! - Check resolver rules carry exactly one replacement kind
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before a snapshot is built from the config

use std::collections::HashSet;
use std::fmt;

use crate::client::{parse_timespan, TimeUnit};
use crate::config::schema::{EndpointConfig, GatewayConfig, ResolverRuleConfig};
use crate::config::snapshot::client_settings;
use crate::routing::matcher::compile_selector;

/// One validation problem, with the path of the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("invalid socket address [{}]", config.server.bind_address),
        ));
    }

    check_timespan(
        &mut errors,
        "storage.lazy_interval",
        Some(&config.storage.lazy_interval),
        TimeUnit::Seconds,
    );
    check_timespan(
        &mut errors,
        "timeouts.timeout",
        config.timeouts.timeout.as_deref(),
        TimeUnit::Millis,
    );
    check_timespan(
        &mut errors,
        "timeouts.connect_timeout",
        config.timeouts.connect_timeout.as_deref(),
        TimeUnit::Millis,
    );

    let mut collections = HashSet::new();
    for (i, coll) in config.header_collections.iter().enumerate() {
        let path = format!("header_collections[{}]", i);
        if coll.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", path), "must not be empty"));
        } else if !collections.insert(coll.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", path),
                format!("duplicate header collection [{}]", coll.name),
            ));
        }
        for (j, header) in coll.headers.iter().enumerate() {
            if header.key.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("{}.headers[{}].key", path, j),
                    "must not be empty",
                ));
            }
        }
    }

    let mut names = HashSet::new();
    for (i, endpoint) in config.endpoints.iter().enumerate() {
        validate_endpoint(&mut errors, i, endpoint, &collections, &mut names);
    }

    for (i, rule) in config.resolvers.iter().enumerate() {
        validate_resolver(&mut errors, i, rule);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "invalid socket address [{}]",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_endpoint<'a>(
    errors: &mut Vec<ValidationError>,
    index: usize,
    endpoint: &'a EndpointConfig,
    collections: &HashSet<&str>,
    names: &mut HashSet<&'a str>,
) {
    let path = format!("endpoints[{}]", index);

    if endpoint.name.trim().is_empty() {
        errors.push(ValidationError::new(format!("{}.name", path), "must not be empty"));
    } else if !names.insert(endpoint.name.as_str()) {
        errors.push(ValidationError::new(
            format!("{}.name", path),
            format!("duplicate endpoint [{}]", endpoint.name),
        ));
    }

    for (j, selector) in endpoint.selectors.iter().enumerate() {
        if let Err(e) = compile_selector(selector) {
            errors.push(ValidationError::new(
                format!("{}.selectors[{}]", path, j),
                format!("invalid pattern [{}]: {}", selector, e),
            ));
        }
    }

    check_timespan(
        errors,
        &format!("{}.timeout", path),
        endpoint.timeout.as_deref(),
        TimeUnit::Millis,
    );
    check_timespan(
        errors,
        &format!("{}.connect_timeout", path),
        endpoint.connect_timeout.as_deref(),
        TimeUnit::Millis,
    );

    if let Some(headers) = &endpoint.headers {
        if !collections.contains(headers.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.headers", path),
                format!("unknown header collection [{}]", headers),
            ));
        }
    }

    if let Some(proxy) = &endpoint.proxy {
        if proxy.addr.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{}.proxy.addr", path),
                "must not be empty",
            ));
        } else if let Err(e) = client_settings(endpoint).validate() {
            errors.push(ValidationError::new(format!("{}.proxy", path), e.to_string()));
        }
    }
}

fn validate_resolver(errors: &mut Vec<ValidationError>, index: usize, rule: &ResolverRuleConfig) {
    let path = format!("resolvers[{}]", index);

    if let Err(e) = regex::Regex::new(&rule.expr) {
        errors.push(ValidationError::new(
            format!("{}.expr", path),
            format!("invalid pattern [{}]: {}", rule.expr, e),
        ));
    }

    let kinds = [
        rule.suffixes.is_some(),
        rule.value.is_some(),
        rule.replace.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if kinds != 1 {
        errors.push(ValidationError::new(
            path.clone(),
            "exactly one of `suffixes`, `value` or `replace` is required",
        ));
    }

    if let Some(suffixes) = &rule.suffixes {
        if suffixes.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.suffixes", path),
                "must not be empty",
            ));
        }
        for (j, suffix) in suffixes.iter().enumerate() {
            if suffix.trim_start_matches('.').is_empty() {
                errors.push(ValidationError::new(
                    format!("{}.suffixes[{}]", path, j),
                    "must not be empty",
                ));
            }
        }
    }
}

fn check_timespan(
    errors: &mut Vec<ValidationError>,
    path: &str,
    value: Option<&str>,
    unit: TimeUnit,
) {
    if let Some(value) = value {
        if let Err(e) = parse_timespan(value, unit) {
            errors.push(ValidationError::new(path, e.to_string()));
        }
    }
}
