//! Observation taxonomy
//!
//! The catalog that makes observations self-describing:
//! - Feature types: what kind of thing is observed
//! - Properties: what about it is observed
//! - Property types: the measurement format, optionally with a payload schema
//!
//! # Example
//!
//! ```rust
//! use obs_taxonomy::TaxonomyRegistry;
//!
//! let registry = TaxonomyRegistry::builtin().unwrap();
//! let resolved = registry.resolve("people", "goal", "textual").unwrap();
//! assert!(resolved.property_type.has_schema());
//! ```

#![warn(unreachable_pub)]
#![recursion_limit = "256"]

pub mod definitions;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{Level, ResolveError, TaxonomyError};
pub use registry::{Resolved, TaxonomyDocument, TaxonomyRegistry};
pub use types::{FeatureType, Property, PropertyType, SchemaSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
