//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Browser connection
//!     → request.rs (request ID)
//!     → server.rs (dispatch table)
//!         /service          → Forwarder
//!         /endpoint_type    → Forwarder::route
//!         /storage/*        → SaveSetStore
//!     → response.rs (status message, X_endpoint, X_took)
//!     → Send to browser
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
