//! Save-set storage.
//!
//! # Data Flow
//! ```text
//! POST /storage/saveset/{name}
//!     → store.rs (in memory, mark dirty)
//!     → writer.rs (after the lazy interval, or on shutdown)
//!     → <storage dir>/ss_<name>.json
//! ```
//!
//! # Design Decisions
//! - Saves never touch the disk on the request path
//! - Plain JSON files, no compression

pub mod store;
pub mod writer;

pub use store::{FileStore, SaveSetStore, StoreError, DEFAULT_SET_NAME};
pub use writer::LazyWriter;
