//! Outbound client subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint config (proxy, TLS policy, timeouts)
//!     → settings.rs (pure settings → reqwest::Client)
//!     → pool.rs (one client per TimeoutProfile, built lazily)
//!     → Forwarder dispatches on the pooled client
//! ```
//!
//! # Design Decisions
//! - TimeoutProfile is a value type and the pool key
//! - Default client built eagerly with the endpoint, overrides on demand
//! - No builder is ever shared between concurrent pool misses

pub mod pool;
pub mod settings;
pub mod timeout;

pub use pool::{ClientPool, PooledClient};
pub use settings::{ClientSettings, ProxyKind, ProxyTarget};
pub use timeout::{parse_timespan, TimeUnit, TimeoutProfile, TimespanError};
