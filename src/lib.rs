//! Local request-forwarding gateway library.

pub mod client;
pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resolver;
pub mod routing;
pub mod storage;
pub mod templates;

pub use config::{GatewaySnapshot, ReloadGate};
pub use forward::{ForwardError, ForwardOutcome, Forwarder};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
