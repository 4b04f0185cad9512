//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → snapshot.rs (compile endpoints, resolver rules, templates)
//!     → GatewaySnapshot (immutable, tagged with its change id)
//!
//! On change:
//!     watcher.rs sees the settings file or a template change
//!     → bumps ChangeCounter
//!     → reload.rs notices on the next request and rebuilds once
//!     → atomic swap of Arc<GatewaySnapshot>
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once built; changes require a full rebuild
//! - All fields have defaults to allow minimal configs
//! - A broken edit never replaces a working snapshot

pub mod loader;
pub mod reload;
pub mod schema;
pub mod snapshot;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use reload::{ChangeCounter, ConfigSource, FileConfigSource, ReloadGate};
pub use schema::{EndpointConfig, GatewayConfig, ResolverRuleConfig};
pub use snapshot::{build_snapshot, GatewaySnapshot, StorageSettings};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
