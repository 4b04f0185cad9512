//! Outbound client construction.
//!
//! A client is a pure function of the endpoint's transport settings and one
//! timeout profile. Nothing here is shared or mutated between builds.

use std::fmt;

use crate::client::timeout::TimeoutProfile;

/// Kind of upstream proxy an endpoint goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Http,
    Socks,
}

/// Upstream proxy address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub kind: ProxyKind,
    pub addr: String,
    pub port: u16,
}

impl ProxyTarget {
    pub fn url(&self) -> String {
        let scheme = match self.kind {
            ProxyKind::Http => "http",
            ProxyKind::Socks => "socks5",
        };
        format!("{}://{}:{}", scheme, self.addr, self.port)
    }

    fn to_reqwest(&self) -> Result<reqwest::Proxy, reqwest::Error> {
        reqwest::Proxy::all(self.url())
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Transport settings shared by every client of one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    pub proxy: Option<ProxyTarget>,
    /// Accept any certificate and any host name. Developer escape hatch, opt-in per endpoint.
    pub ignore_cert_errors: bool,
}

impl ClientSettings {
    /// Build an immutable client for the given timeouts.
    pub fn build(&self, timeout: TimeoutProfile) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(timeout.connect())
            .timeout(timeout.call());

        builder = match &self.proxy {
            Some(proxy) => builder.proxy(proxy.to_reqwest()?),
            None => builder.no_proxy(),
        };

        if self.ignore_cert_errors {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        builder.build()
    }

    /// Check that the proxy address forms a usable proxy URL.
    pub fn validate(&self) -> Result<(), reqwest::Error> {
        match &self.proxy {
            Some(proxy) => proxy.to_reqwest().map(|_| ()),
            None => Ok(()),
        }
    }
}
