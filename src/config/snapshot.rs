//! Immutable runtime view of one configuration.
//!
//! # Responsibilities
//! - Compile a validated `GatewayConfig` into ready-to-use parts
//! - Tag the result with the change id it was built for
//!
//! # Design Decisions
//! - Built completely before anyone can see it; replaced wholesale on reload
//! - Resolver rule kinds are decided here, once, from the config shape
//! - Every endpoint's default client is built here, so client errors surface at load

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::client::{parse_timespan, ClientSettings, ProxyKind, ProxyTarget, TimeUnit, TimeoutProfile};
use crate::config::loader::ConfigError;
use crate::config::schema::{EndpointConfig, GatewayConfig, ProxyType, ResolverRuleConfig};
use crate::config::validation::ValidationError;
use crate::resolver::{HostProbe, ResolverChain, ResolverRule};
use crate::routing::matcher::compile_selector;
use crate::routing::{Endpoint, EndpointDefinition, EndpointRegistry, HeaderPair, SelectorMatcher};
use crate::templates::TemplateCollections;

/// Storage settings resolved against the settings directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub dir: PathBuf,
    pub lazy_interval: Duration,
}

/// Everything one forwarded call needs, built from a single configuration.
#[derive(Debug)]
pub struct GatewaySnapshot {
    pub change_id: u64,
    pub debug: bool,
    pub default_timeout: TimeoutProfile,
    pub registry: EndpointRegistry,
    pub resolver: ResolverChain,
    pub storage: StorageSettings,
}

impl GatewaySnapshot {
    /// Snapshot without endpoints or resolver rules.
    #[cfg(test)]
    pub(crate) fn empty(change_id: u64) -> Result<Self, ConfigError> {
        build_snapshot(
            &GatewayConfig::default(),
            Path::new("."),
            change_id,
            Arc::new(crate::resolver::SystemProbe),
        )
    }
}

/// Build a snapshot. Relative directories are taken relative to `root`.
pub fn build_snapshot(
    config: &GatewayConfig,
    root: &Path,
    change_id: u64,
    probe: Arc<dyn HostProbe>,
) -> Result<GatewaySnapshot, ConfigError> {
    let default_timeout = TimeoutProfile::DEFAULT.inherit(
        config.timeouts.timeout.as_deref(),
        config.timeouts.connect_timeout.as_deref(),
    )?;

    let templates = TemplateCollections::load_from_dir(&root.join(&config.templates.dir))?;
    templates.dump();

    let mut endpoints = Vec::with_capacity(config.endpoints.len());
    for ep in &config.endpoints {
        endpoints.push(build_endpoint(config, ep, default_timeout, &templates)?);
    }
    let fallback = Endpoint::fallback(default_timeout, templates.combined("*")?).map_err(|source| {
        ConfigError::Endpoint {
            name: crate::routing::DEFAULT_ENDPOINT_NAME.to_string(),
            source,
        }
    })?;
    for ep in &endpoints {
        tracing::info!("{}", ep);
    }

    let rules = config
        .resolvers
        .iter()
        .map(|rule| build_rule(rule, probe.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let storage = StorageSettings {
        dir: root.join(&config.storage.dir),
        lazy_interval: Duration::from_millis(parse_timespan(
            &config.storage.lazy_interval,
            TimeUnit::Seconds,
        )?),
    };

    Ok(GatewaySnapshot {
        change_id,
        debug: config.debug,
        default_timeout,
        registry: EndpointRegistry::new(endpoints, fallback),
        resolver: ResolverChain::new(rules),
        storage,
    })
}

fn build_endpoint(
    config: &GatewayConfig,
    ep: &EndpointConfig,
    default_timeout: TimeoutProfile,
    templates: &TemplateCollections,
) -> Result<Endpoint, ConfigError> {
    let mut def = EndpointDefinition::new(ep.name.clone());

    let patterns = ep
        .selectors
        .iter()
        .map(|expr| {
            compile_selector(expr).map_err(|source| ConfigError::Pattern {
                expr: expr.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    def.selectors = SelectorMatcher::new(patterns);
    def.timeout = default_timeout.inherit(ep.timeout.as_deref(), ep.connect_timeout.as_deref())?;

    if let Some(name) = &ep.headers {
        let collection = config
            .header_collections
            .iter()
            .find(|c| &c.name == name)
            .ok_or_else(|| {
                ConfigError::Validation(vec![ValidationError {
                    path: format!("endpoints[{}].headers", ep.name),
                    message: format!("unknown header collection [{}]", name),
                }])
            })?;
        def.headers = collection
            .headers
            .iter()
            .map(|h| HeaderPair::new(h.key.clone(), h.value.clone()))
            .collect();
    }

    def.client = client_settings(ep);
    def.templates = templates.combined(&ep.templates)?;
    def.autocomplete = ep.autocomplete.clone();
    def.response_plugins = Some(ep.response_plugins.clone());

    Endpoint::build(def).map_err(|source| ConfigError::Endpoint {
        name: ep.name.clone(),
        source,
    })
}

/// Transport settings of a configured endpoint.
pub(crate) fn client_settings(ep: &EndpointConfig) -> ClientSettings {
    ClientSettings {
        proxy: ep.proxy.as_ref().map(|p| ProxyTarget {
            kind: match p.kind {
                ProxyType::Http => ProxyKind::Http,
                ProxyType::Socks => ProxyKind::Socks,
            },
            addr: p.addr.clone(),
            port: p.port,
        }),
        ignore_cert_errors: ep.ignore_certificate_errors,
    }
}

fn build_rule(rule: &ResolverRuleConfig, probe: Arc<dyn HostProbe>) -> Result<ResolverRule, ConfigError> {
    let trigger = Regex::new(&rule.expr).map_err(|source| ConfigError::Pattern {
        expr: rule.expr.clone(),
        source,
    })?;

    match (&rule.suffixes, &rule.value, &rule.replace) {
        (Some(suffixes), None, None) => Ok(ResolverRule::suffix(trigger, suffixes, probe)),
        (None, Some(value), None) => Ok(ResolverRule::exact(trigger, value.clone())),
        (None, None, Some(replace)) => Ok(ResolverRule::expression(trigger, replace.clone())),
        _ => Err(ConfigError::Validation(vec![ValidationError {
            path: format!("resolvers[{}]", rule.expr),
            message: "exactly one of `suffixes`, `value` or `replace` is required".to_string(),
        }])),
    }
}
