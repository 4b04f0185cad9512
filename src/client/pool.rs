//! Per-endpoint pool of outbound clients.
//!
//! # Responsibilities
//! - Hand out the endpoint's default client for its own timeout profile
//! - Lazily build and retain one client per distinct override profile
//!
//! # Design Decisions
//! - Lookup, build and insert happen under one lock per endpoint, so concurrent
//!   first use of a profile builds a single client
//! - Retained override profiles are capped; past the cap a client is built for
//!   the call and dropped with it

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::client::settings::ClientSettings;
use crate::client::timeout::TimeoutProfile;
use crate::observability::metrics;

/// Maximum number of override profiles retained per endpoint.
pub const MAX_POOLED_PROFILES: usize = 64;

/// A reusable outbound client bound to one timeout profile.
#[derive(Debug)]
pub struct PooledClient {
    timeout: TimeoutProfile,
    inner: reqwest::Client,
}

impl PooledClient {
    pub fn timeout(&self) -> TimeoutProfile {
        self.timeout
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner
    }
}

/// Clients of one endpoint, keyed by timeout profile.
#[derive(Debug)]
pub struct ClientPool {
    owner: String,
    settings: ClientSettings,
    default: Arc<PooledClient>,
    overrides: Mutex<HashMap<TimeoutProfile, Arc<PooledClient>>>,
}

impl ClientPool {
    /// Create the pool and its default client.
    pub fn new(
        owner: impl Into<String>,
        settings: ClientSettings,
        default_timeout: TimeoutProfile,
    ) -> Result<Self, reqwest::Error> {
        let inner = settings.build(default_timeout)?;
        Ok(Self {
            owner: owner.into(),
            settings,
            default: Arc::new(PooledClient {
                timeout: default_timeout,
                inner,
            }),
            overrides: Mutex::new(HashMap::new()),
        })
    }

    pub fn default_timeout(&self) -> TimeoutProfile {
        self.default.timeout
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Get a client configured for `timeout`.
    pub fn client_for(&self, timeout: TimeoutProfile) -> Result<Arc<PooledClient>, reqwest::Error> {
        if timeout == self.default.timeout {
            return Ok(self.default.clone());
        }

        let mut overrides = self
            .overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(client) = overrides.get(&timeout) {
            return Ok(client.clone());
        }

        let client = Arc::new(PooledClient {
            timeout,
            inner: self.settings.build(timeout)?,
        });

        if overrides.len() < MAX_POOLED_PROFILES {
            overrides.insert(timeout, client.clone());
            metrics::record_client_pool_size(&self.owner, overrides.len());
            tracing::debug!(endpoint = %self.owner, timeout = %timeout, "Pooled new outbound client");
        } else {
            tracing::warn!(
                endpoint = %self.owner,
                timeout = %timeout,
                limit = MAX_POOLED_PROFILES,
                "Client pool full, using a one-off client"
            );
        }
        Ok(client)
    }

    /// Number of retained override clients.
    pub fn pooled(&self) -> usize {
        self.overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
