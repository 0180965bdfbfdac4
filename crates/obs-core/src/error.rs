//! Service errors and the response boundary
//!
//! Every failure the service returns falls in one of three classes that a
//! transport maps to a status: invalid input, not found, or internal.

use obs_observation::{FieldError, FilterError, ObservationError, SchemaError, ValidationError};
use obs_store::StoreError;
use obs_taxonomy::{ResolveError, TaxonomyError};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Message returned for a failed save
pub const SAVE_FAILED: &str = "unable to save observation";

/// Message returned for any other internal failure
pub const INTERNAL_ERROR: &str = "internal server error";

/// Message returned for a request body that is not JSON
pub const MALFORMED_PAYLOAD: &str = "error decoding observation";

/// How a failure should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The caller sent something unusable
    Invalid,
    /// The thing asked for does not exist
    NotFound,
    /// Anything else
    Internal,
}

impl ErrorClass {
    /// HTTP-equivalent status
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Invalid => 422,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Submission failed structural or payload validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Filter outside the allow-list
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Request body is not valid JSON
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Taxonomy slug did not resolve
    #[error(transparent)]
    Taxonomy(#[from] ResolveError),

    /// No observation with this id
    #[error("observation '{0}' not found")]
    NotFound(String),

    /// Payload schema unusable
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Store call failed
    #[error("{operation} failed: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// Startup configuration invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Definition set invalid
    #[error("taxonomy error: {0}")]
    TaxonomyLoad(#[from] TaxonomyError),
}

impl From<ObservationError> for ServiceError {
    fn from(err: ObservationError) -> Self {
        match err {
            ObservationError::Invalid(e) => Self::Validation(e),
            ObservationError::Schema(e) => Self::Schema(e),
        }
    }
}

impl ServiceError {
    /// Wrap a store failure; a missing record becomes [`Self::NotFound`]
    #[must_use]
    pub fn storage(operation: &'static str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound(id) => Self::NotFound(id),
            source => Self::Storage { operation, source },
        }
    }

    /// Classification for status mapping
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::Filter(_) | Self::MalformedPayload(_) => {
                ErrorClass::Invalid
            }
            Self::Taxonomy(_) | Self::NotFound(_) => ErrorClass::NotFound,
            Self::Schema(_) | Self::Storage { .. } | Self::Config(_) | Self::TaxonomyLoad(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// HTTP-equivalent status
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.class().status_code()
    }

    /// Whether the same request might succeed if repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { source, .. } if source.is_retryable())
    }

    /// Serializable body for the transport layer
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Self::Validation(e) => ErrorResponse {
                error: e.message.clone(),
                fields: e.fields.clone(),
            },
            Self::MalformedPayload(_) => ErrorResponse::new(MALFORMED_PAYLOAD),
            Self::Storage {
                operation: "save", ..
            } => ErrorResponse::new(SAVE_FAILED),
            Self::Schema(_) | Self::Storage { .. } | Self::Config(_) | Self::TaxonomyLoad(_) => {
                ErrorResponse::new(INTERNAL_ERROR)
            }
            Self::Filter(_) | Self::Taxonomy(_) | Self::NotFound(_) => {
                ErrorResponse::new(self.to_string())
            }
        }
    }
}

/// Error body handed to the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Top-level message
    pub error: String,
    /// Field errors, for validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ErrorResponse {
    /// Response without field details
    #[inline]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: Vec::new(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        err.to_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obs_taxonomy::Level;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_classes() {
        let invalid: ServiceError = ValidationError::new("bad").into();
        assert_eq!(invalid.status_code(), 422);

        let filter: ServiceError = FilterError::UnsupportedField("color".into()).into();
        assert_eq!(filter.status_code(), 422);

        let miss: ServiceError = ResolveError::new(Level::Property, "mood").into();
        assert_eq!(miss.status_code(), 404);

        let storage = ServiceError::storage("save", StoreError::Backend("disk full".into()));
        assert_eq!(storage.status_code(), 500);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let err = ServiceError::storage("find_by_id", StoreError::NotFound("x".into()));
        assert!(matches!(err, ServiceError::NotFound(ref id) if id == "x"));
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn test_only_timeouts_retry() {
        let timeout = ServiceError::storage(
            "save",
            StoreError::Timeout {
                operation: "save",
                after: Duration::from_secs(5),
            },
        );
        assert!(timeout.is_retryable());
        assert!(!ServiceError::storage("save", StoreError::Cancelled).is_retryable());
        assert!(!ServiceError::from(ValidationError::new("bad")).is_retryable());
    }

    #[test]
    fn test_storage_details_hidden() {
        let save = ServiceError::storage("save", StoreError::Backend("10.0.0.3 refused".into()));
        assert_eq!(save.to_response(), ErrorResponse::new(SAVE_FAILED));

        let list = ServiceError::storage("find_many", StoreError::Backend("boom".into()));
        assert_eq!(list.to_response(), ErrorResponse::new(INTERNAL_ERROR));
    }

    #[test]
    fn test_validation_response_lists_fields() {
        let err: ServiceError = ValidationError::new("error validating observation")
            .with_field("feature.id", "feature.id is a required field")
            .into();
        let body = serde_json::to_value(err.to_response()).unwrap();

        assert_eq!(
            body,
            json!({
                "error": "error validating observation",
                "fields": [{"field": "feature.id", "error": "feature.id is a required field"}]
            })
        );
    }

    #[test]
    fn test_resolution_miss_response_names_segment() {
        let err: ServiceError = ResolveError::new(Level::FeatureType, "gardens").into();
        assert_eq!(
            err.to_response().error,
            "could not find feature type 'gardens'"
        );
    }
}
