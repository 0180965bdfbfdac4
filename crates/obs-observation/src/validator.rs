//! Structural and combined validation of submissions

use std::sync::Arc;

use obs_taxonomy::PropertyType;
use url::Url;
use uuid::Uuid;

use crate::error::{FieldError, ObservationError, ValidationError, INVALID_OBSERVATION};
use crate::model::{Geometry, NewObservation, Referenceable};
use crate::payload::{PayloadValidator, ROOT_FIELD};

/// Whether `value` parses as a UUID
#[inline]
#[must_use]
pub fn is_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Whether `value` parses as an absolute URI
#[inline]
#[must_use]
pub fn is_uri(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Structural rules every observation must meet, independent of payload
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Every structural problem with the submission, in field order
    #[must_use]
    pub fn check(&self, new_obs: &NewObservation) -> Vec<FieldError> {
        let mut errors = Vec::new();

        check_reference("feature", &new_obs.feature, &mut errors);
        check_reference("featureType", &new_obs.feature_type, &mut errors);
        check_reference("property", &new_obs.property, &mut errors);
        check_reference("propertyType", &new_obs.property_type, &mut errors);
        check_reference("process", &new_obs.process, &mut errors);

        if new_obs.valid_interval.duration < 0 {
            errors.push(FieldError::new(
                "validInterval.duration",
                "validInterval.duration must not be negative",
            ));
        }

        check_geometry("phenomenonLocation", new_obs.phenomenon_location.as_ref(), &mut errors);
        check_geometry("observationLocation", new_obs.observation_location.as_ref(), &mut errors);

        if new_obs.result.is_null() {
            errors.push(FieldError::new("result", "result is a required field"));
        }

        errors
    }

    /// Validate a submission
    ///
    /// # Errors
    /// Returns every structural problem found, not just the first
    pub fn validate(&self, new_obs: &NewObservation) -> Result<(), ValidationError> {
        ValidationError::check(INVALID_OBSERVATION, self.check(new_obs))
    }
}

fn check_reference(name: &str, reference: &Referenceable, errors: &mut Vec<FieldError>) {
    let field = format!("{name}.id");
    let id = reference.id.trim();

    if id.is_empty() {
        errors.push(FieldError::new(&field, format!("{field} is a required field")));
    } else if !is_uuid(id) && !is_uri(id) {
        errors.push(FieldError::new(
            &field,
            format!("{field} must be a valid UUID or URI"),
        ));
    }

    if let Some(link) = &reference.reference {
        if !is_uri(link) {
            let field = format!("{name}.reference");
            errors.push(FieldError::new(&field, format!("{field} must be a valid URI")));
        }
    }
}

fn check_geometry(name: &str, geometry: Option<&Geometry>, errors: &mut Vec<FieldError>) {
    let Some(geometry) = geometry else {
        return;
    };
    for problem in geometry.problems() {
        errors.push(FieldError::new(format!("{name}.coordinates"), problem));
    }
}

/// Structural rules plus payload schema, reported together
#[derive(Debug, Clone, Default)]
pub struct GenericValidator {
    structural: StructuralValidator,
    payload: Arc<PayloadValidator>,
}

impl GenericValidator {
    /// Create validator around a shared payload validator
    #[inline]
    #[must_use]
    pub fn new(payload: Arc<PayloadValidator>) -> Self {
        Self {
            structural: StructuralValidator::new(),
            payload,
        }
    }

    /// The structural half
    #[inline]
    #[must_use]
    pub fn structural(&self) -> &StructuralValidator {
        &self.structural
    }

    /// The payload half
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &PayloadValidator {
        &self.payload
    }

    /// Validate structure and, when a property type is given, the `result`
    /// payload against its schema
    ///
    /// Payload field errors are reported under `result`.
    ///
    /// # Errors
    /// Returns all structural and payload field errors in one
    /// [`ValidationError`], or a schema error if the schema is unusable
    pub fn validate(
        &self,
        new_obs: &NewObservation,
        property_type: Option<&PropertyType>,
    ) -> Result<(), ObservationError> {
        let mut errors = self.structural.check(new_obs);

        if let Some(pt) = property_type {
            if !new_obs.result.is_null() {
                let payload_errors = self.payload.check(&new_obs.result, pt)?;
                errors.extend(payload_errors.into_iter().map(under_result));
            }
        }

        ValidationError::check(INVALID_OBSERVATION, errors)?;
        Ok(())
    }
}

fn under_result(error: FieldError) -> FieldError {
    let field = if error.field == ROOT_FIELD {
        "result".to_string()
    } else {
        format!("result.{}", error.field)
    };
    FieldError { field, ..error }
}
