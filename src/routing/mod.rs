//! Endpoint selection subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved outbound URL
//!     → registry.rs (ordered scan)
//!     → matcher.rs (selector patterns, any-of)
//!     → Return: first matching Endpoint, else the default
//!
//! Endpoint Compilation (at config load):
//!     EndpointConfig[]
//!     → Compile selectors, validate headers
//!     → Build default client per endpoint
//!     → Freeze as immutable EndpointRegistry
//! ```
//!
//! # Design Decisions
//! - Endpoints compiled at load, immutable at runtime
//! - Deterministic: same URL always selects the same endpoint
//! - First match wins (configuration order)

pub mod endpoint;
pub mod matcher;
pub mod registry;

pub use endpoint::{Endpoint, EndpointDefinition, EndpointError, HeaderPair, DEFAULT_ENDPOINT_NAME};
pub use matcher::{Matcher, SelectorMatcher};
pub use registry::EndpointRegistry;
