//! Forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! Browser call (method, url, body)
//!     → url.rs (inline timeout override)
//!     → resolver chain (host rewrite)
//!     → endpoint registry (first match, else default)
//!     → client pool (client for the effective timeout)
//!     → body.rs (file directive, media type)
//!     → upstream
//!     → status.rs (status message)
//!     → ForwardOutcome or ForwardError
//! ```

pub mod body;
pub mod error;
pub mod forwarder;
pub mod status;
pub mod url;

pub use error::ForwardError;
pub use forwarder::{ForwardOutcome, Forwarder, Route};
