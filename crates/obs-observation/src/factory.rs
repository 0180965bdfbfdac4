//! Observation construction
//!
//! Pure transformation plus validation: the caller supplies the id and the
//! current time, nothing here touches the clock, the network or storage.

use chrono::{DateTime, Utc};
use obs_taxonomy::PropertyType;

use crate::error::{ObservationError, ValidationError};
use crate::model::{Interval, NewObservation, Observation};
use crate::validator::GenericValidator;

/// Turns submissions into persistable observations
#[derive(Debug, Clone, Default)]
pub struct ObservationFactory {
    validator: GenericValidator,
}

impl ObservationFactory {
    /// Create factory
    #[inline]
    #[must_use]
    pub fn new(validator: GenericValidator) -> Self {
        Self { validator }
    }

    /// The validator used by [`Self::create_checked`]
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &GenericValidator {
        &self.validator
    }

    /// Build an observation, checking structural rules only
    ///
    /// Omitted or unset timestamps default to `now`; supplied ones are kept
    /// as-is.
    ///
    /// # Errors
    /// Returns every structural problem with the submission
    pub fn create(
        &self,
        new_obs: NewObservation,
        id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Observation, ValidationError> {
        self.validator.structural().validate(&new_obs)?;
        Ok(assemble(new_obs, id.into(), now))
    }

    /// Build an observation, also checking `result` against the property
    /// type's schema when one is given
    ///
    /// # Errors
    /// Returns structural and payload problems together, or a schema
    /// error if the property type's schema is unusable
    pub fn create_checked(
        &self,
        new_obs: NewObservation,
        property_type: Option<&PropertyType>,
        id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Observation, ObservationError> {
        self.validator.validate(&new_obs, property_type)?;
        Ok(assemble(new_obs, id.into(), now))
    }
}

/// `0001-01-01T00:00:00Z`, what many clients serialize for an unset time
const UNSET_INSTANT_SECS: i64 = -62_135_596_800;

/// Whether a supplied timestamp is a zero value rather than a real instant
fn is_unset(time: &DateTime<Utc>) -> bool {
    *time == DateTime::<Utc>::MIN_UTC
        || (time.timestamp() == UNSET_INSTANT_SECS && time.timestamp_subsec_nanos() == 0)
}

fn or_now(time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    time.filter(|t| !is_unset(t)).unwrap_or(now)
}

fn assemble(new_obs: NewObservation, id: String, now: DateTime<Utc>) -> Observation {
    let NewObservation {
        phenomenon_time,
        result_time,
        valid_interval,
        phenomenon_location,
        observation_location,
        feature,
        feature_type,
        property,
        property_type,
        process,
        tags,
        context,
        result,
        scale,
    } = new_obs;

    Observation {
        id,
        phenomenon_time: or_now(phenomenon_time, now),
        result_time: or_now(result_time, now),
        valid_interval: Interval {
            start_time: or_now(valid_interval.start_time, now),
            duration: valid_interval.duration,
        },
        phenomenon_location,
        observation_location,
        feature_id: feature.id.clone(),
        feature_type_id: feature_type.id.clone(),
        property_id: property.id.clone(),
        property_type_id: property_type.id.clone(),
        process_id: process.id.clone(),
        feature,
        feature_type,
        property,
        property_type,
        process,
        tags,
        context,
        result,
        scale,
    }
}
