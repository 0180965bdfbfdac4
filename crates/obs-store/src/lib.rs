//! Observation persistence
//!
//! [`ObservationStore`] is the port the service talks to. Two
//! interchangeable backends are provided:
//! - [`MemoryStore`]: concurrent in-process map
//! - [`FileStore`]: one JSON document per observation on disk
//!
//! Every call made on behalf of a request goes through
//! [`RequestContext::run`], which bounds it with a deadline and aborts it
//! on cancellation.

#![warn(unreachable_pub)]

pub mod context;
pub mod file;
pub mod memory;
pub mod port;

pub use context::{CancelHandle, RequestContext, DEFAULT_TIMEOUT};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use port::{ObservationStore, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
