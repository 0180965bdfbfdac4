//! Observation records
//!
//! [`NewObservation`] is what a caller submits; it is never stored as-is.
//! [`Observation`] is the normalized, validated record produced by the
//! factory and handed to storage. Once built it is read-only.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A typed pointer into the taxonomy or at an external resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referenceable {
    /// UUID or absolute URI
    #[serde(default)]
    pub id: String,
    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link to an external resource (absolute URI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Referenceable {
    /// Create a reference with only an id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// With label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With external reference
    #[inline]
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Validity window as submitted; the start may be omitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialInterval {
    /// Start of the window, defaults to creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Length of the window in seconds
    #[serde(default)]
    pub duration: i64,
}

/// Validity window of a stored observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    /// Start of the window
    pub start_time: DateTime<Utc>,
    /// Length of the window in seconds
    #[serde(default)]
    pub duration: i64,
}

/// GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position
    Point { coordinates: Vec<f64> },
    /// Several positions
    MultiPoint { coordinates: Vec<Vec<f64>> },
    /// A path of two or more positions
    LineString { coordinates: Vec<Vec<f64>> },
    /// Several paths
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    /// Closed linear rings, exterior first
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    /// Several polygons
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

impl Geometry {
    /// Point geometry from a position
    #[inline]
    #[must_use]
    pub fn point(position: impl Into<Vec<f64>>) -> Self {
        Self::Point {
            coordinates: position.into(),
        }
    }

    /// Describe every malformed part of the geometry
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match self {
            Self::Point { coordinates } => check_position(coordinates, &mut problems),
            Self::MultiPoint { coordinates } => {
                coordinates
                    .iter()
                    .for_each(|p| check_position(p, &mut problems));
            }
            Self::LineString { coordinates } => check_line(coordinates, &mut problems),
            Self::MultiLineString { coordinates } => {
                coordinates.iter().for_each(|l| check_line(l, &mut problems));
            }
            Self::Polygon { coordinates } => {
                coordinates.iter().for_each(|r| check_ring(r, &mut problems));
            }
            Self::MultiPolygon { coordinates } => coordinates
                .iter()
                .flatten()
                .for_each(|r| check_ring(r, &mut problems)),
        }
        problems
    }
}

fn check_position(position: &[f64], problems: &mut Vec<String>) {
    if !(2..=3).contains(&position.len()) {
        problems.push(format!(
            "position must have 2 or 3 coordinates, found {}",
            position.len()
        ));
    }
}

fn check_line(line: &[Vec<f64>], problems: &mut Vec<String>) {
    if line.len() < 2 {
        problems.push("line string must have at least 2 positions".to_string());
    }
    line.iter().for_each(|p| check_position(p, problems));
}

fn check_ring(ring: &[Vec<f64>], problems: &mut Vec<String>) {
    if ring.len() < 4 {
        problems.push("linear ring must have at least 4 positions".to_string());
    } else if ring.first() != ring.last() {
        problems.push("linear ring must be closed".to_string());
    }
    ring.iter().for_each(|p| check_position(p, problems));
}

/// An observation as submitted by a caller
///
/// Omitted fields deserialize to their defaults so that missing required
/// data surfaces as field errors from validation rather than parse errors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewObservation {
    /// When the observed phenomenon occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phenomenon_time: Option<DateTime<Utc>>,
    /// When the result was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_time: Option<DateTime<Utc>>,
    /// Window during which the result is valid
    #[serde(default)]
    pub valid_interval: PartialInterval,
    /// Where the phenomenon occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phenomenon_location: Option<Geometry>,
    /// Where the observer was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_location: Option<Geometry>,

    /// The observed entity
    #[serde(default)]
    pub feature: Referenceable,
    /// Taxonomy category of the entity
    #[serde(default)]
    pub feature_type: Referenceable,
    /// Observed attribute
    #[serde(default)]
    pub property: Referenceable,
    /// Measurement format
    #[serde(default)]
    pub property_type: Referenceable,
    /// How the observation was made
    #[serde(default)]
    pub process: Referenceable,

    /// Free-form labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Ordered context notes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    /// The measurement payload
    #[serde(default)]
    pub result: JsonValue,
    /// Unit or scale of the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
}

impl NewObservation {
    /// Submission with the five references and a result; everything else
    /// left at its default
    #[must_use]
    pub fn new(
        feature: Referenceable,
        feature_type: Referenceable,
        property: Referenceable,
        property_type: Referenceable,
        process: Referenceable,
        result: JsonValue,
    ) -> Self {
        Self {
            feature,
            feature_type,
            property,
            property_type,
            process,
            result,
            ..Self::default()
        }
    }
}

/// A validated, persistable observation
///
/// Only [`crate::ObservationFactory`] builds these (or storage, when
/// decoding a saved document). The `*_id` fields are flat copies of the
/// corresponding reference ids and exist for indexed filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub(crate) id: String,

    pub(crate) phenomenon_time: DateTime<Utc>,
    pub(crate) result_time: DateTime<Utc>,
    pub(crate) valid_interval: Interval,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) phenomenon_location: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) observation_location: Option<Geometry>,

    pub(crate) feature: Referenceable,
    pub(crate) feature_type: Referenceable,
    pub(crate) property: Referenceable,
    pub(crate) property_type: Referenceable,
    pub(crate) process: Referenceable,

    pub(crate) feature_id: String,
    pub(crate) feature_type_id: String,
    pub(crate) property_id: String,
    pub(crate) property_type_id: String,
    pub(crate) process_id: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) context: Vec<String>,

    pub(crate) result: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) scale: Option<String>,
}

impl Observation {
    /// Unique id assigned at creation
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the observed phenomenon occurred
    #[inline]
    #[must_use]
    pub fn phenomenon_time(&self) -> DateTime<Utc> {
        self.phenomenon_time
    }

    /// When the result was produced
    #[inline]
    #[must_use]
    pub fn result_time(&self) -> DateTime<Utc> {
        self.result_time
    }

    /// Validity window
    #[inline]
    #[must_use]
    pub fn valid_interval(&self) -> Interval {
        self.valid_interval
    }

    /// Where the phenomenon occurred
    #[inline]
    #[must_use]
    pub fn phenomenon_location(&self) -> Option<&Geometry> {
        self.phenomenon_location.as_ref()
    }

    /// Where the observer was
    #[inline]
    #[must_use]
    pub fn observation_location(&self) -> Option<&Geometry> {
        self.observation_location.as_ref()
    }

    /// The observed entity
    #[inline]
    #[must_use]
    pub fn feature(&self) -> &Referenceable {
        &self.feature
    }

    /// Taxonomy category of the entity
    #[inline]
    #[must_use]
    pub fn feature_type(&self) -> &Referenceable {
        &self.feature_type
    }

    /// Observed attribute
    #[inline]
    #[must_use]
    pub fn property(&self) -> &Referenceable {
        &self.property
    }

    /// Measurement format
    #[inline]
    #[must_use]
    pub fn property_type(&self) -> &Referenceable {
        &self.property_type
    }

    /// How the observation was made
    #[inline]
    #[must_use]
    pub fn process(&self) -> &Referenceable {
        &self.process
    }

    /// Indexed copy of `feature.id`
    #[inline]
    #[must_use]
    pub fn feature_id(&self) -> &str {
        &self.feature_id
    }

    /// Indexed copy of `featureType.id`
    #[inline]
    #[must_use]
    pub fn feature_type_id(&self) -> &str {
        &self.feature_type_id
    }

    /// Indexed copy of `property.id`
    #[inline]
    #[must_use]
    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    /// Indexed copy of `propertyType.id`
    #[inline]
    #[must_use]
    pub fn property_type_id(&self) -> &str {
        &self.property_type_id
    }

    /// Indexed copy of `process.id`
    #[inline]
    #[must_use]
    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    /// Free-form labels
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Ordered context notes
    #[inline]
    #[must_use]
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// The measurement payload, exactly as submitted
    #[inline]
    #[must_use]
    pub fn result(&self) -> &JsonValue {
        &self.result
    }

    /// Unit or scale of the result
    #[inline]
    #[must_use]
    pub fn scale(&self) -> Option<&str> {
        self.scale.as_deref()
    }
}
