//! Host-name resolution overrides.
//!
//! # Data Flow
//! ```text
//! forwarded URL
//!     → chain.rs (extract host, lowercase, cache lookup)
//!     → rules.rs on miss (suffix probe | exact | expression), first hit wins
//!     → probe.rs (blocking resolvability check, suffix rules only)
//!     → host spliced back into the URL
//! ```
//!
//! # Design Decisions
//! - Resolution never fails; an unmatched name is used as is
//! - Cache is write-if-absent, rule evaluation happens outside the cache lock
//! - Suffix rules are the slow ones; ordering them last is a configuration concern

pub mod chain;
pub mod probe;
pub mod rules;

pub use chain::ResolverChain;
pub use probe::{HostProbe, SystemProbe};
pub use rules::ResolverRule;
