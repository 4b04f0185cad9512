//! Host-name resolvability checks used by suffix rules.

use std::net::ToSocketAddrs;

/// Answers whether a host name currently resolves to an address.
pub trait HostProbe: Send + Sync + std::fmt::Debug {
    /// Blocking lookup; `false` on any failure.
    fn is_resolvable(&self, host: &str) -> bool;
}

/// Probe backed by the operating system resolver (hosts file, DNS).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn is_resolvable(&self, host: &str) -> bool {
        match (host, 0u16).to_socket_addrs() {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                tracing::trace!(host = %host, error = %e, "Host lookup failed");
                false
            }
        }
    }
}
