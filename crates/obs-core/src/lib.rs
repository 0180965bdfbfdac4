//! Observation service
//!
//! The entry point for recording and querying self-describing
//! observations:
//! - Validated creation of submitted observations
//! - Generic recording of payloads addressed by taxonomy slugs
//! - Filtered listing over the indexed identifier fields
//! - Configuration and the error/response boundary
//!
//! # Example
//!
//! ```rust
//! use obs_core::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), ServiceError> {
//! let service = ObservationService::builder().build()?;
//! let ctx = service.context();
//!
//! let obs = service
//!     .record(&ctx, "people", "goal", "textual", "urn:example:ada", json!({"goal": "ship it"}))
//!     .await?;
//!
//! let mine = service
//!     .list(&ctx, &[Filter::equals("featureId", "urn:example:ada")])
//!     .await?;
//! assert_eq!(mine[0].id(), obs.id());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod config;
pub mod error;
pub mod service;

pub use clock::{Clock, FixedClock, IdGenerator, SequentialIds, SystemClock, UuidIds};
pub use config::{
    ConfigError, ServiceConfig, StoreBackend, StoreConfig, TaxonomyConfig, GENERIC_UPLOAD_PROCESS,
};
pub use error::{ErrorClass, ErrorResponse, ServiceError};
pub use service::{ObservationService, ServiceBuilder};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the observation service
    pub use crate::{ObservationService, ServiceConfig, ServiceError};
    pub use obs_observation::{Filter, NewObservation, Observation, Referenceable};
    pub use obs_store::RequestContext;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
