//! Observation model
//!
//! Everything between a raw submission and a persistable record:
//! - [`NewObservation`] / [`Observation`]: submitted and stored shapes
//! - [`StructuralValidator`], [`PayloadValidator`], [`GenericValidator`]:
//!   field-level validation with aggregated errors
//! - [`ObservationFactory`]: normalization and denormalization
//! - [`FilterTranslator`]: abstract filters to [`ObservationQuery`]
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use obs_observation::{NewObservation, ObservationFactory, Referenceable};
//! use serde_json::json;
//!
//! let new_obs = NewObservation::new(
//!     Referenceable::new("https://example.com/banners-garden"),
//!     Referenceable::new("urn:example:garden"),
//!     Referenceable::new("urn:example:flowers"),
//!     Referenceable::new("urn:example:count"),
//!     Referenceable::new("urn:example:manual-count"),
//!     json!({"wisteria": 5}),
//! );
//!
//! let obs = ObservationFactory::default()
//!     .create(new_obs, "obs-1", Utc::now())
//!     .unwrap();
//! assert_eq!(obs.feature_id(), "https://example.com/banners-garden");
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod factory;
pub mod filter;
pub mod model;
pub mod payload;
pub mod validator;

pub use error::{
    FieldError, FilterError, ObservationError, SchemaError, ValidationError, INVALID_OBSERVATION,
    INVALID_PAYLOAD,
};
pub use factory::ObservationFactory;
pub use filter::{
    Clause, Filter, FilterTranslator, IndexedField, Matcher, ObservationQuery, SearchParams,
    SortOrder,
};
pub use model::{Geometry, Interval, NewObservation, Observation, PartialInterval, Referenceable};
pub use payload::{PayloadValidator, ROOT_FIELD};
pub use validator::{is_uri, is_uuid, GenericValidator, StructuralValidator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
