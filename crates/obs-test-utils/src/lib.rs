//! Testing utilities for the observation workspace
//!
//! Shared fixtures: a garden taxonomy, sample submissions and payloads.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use indexmap::IndexMap;
use obs_observation::{NewObservation, Observation, ObservationFactory, Referenceable};
use obs_taxonomy::{
    FeatureType, Property, PropertyType, SchemaSource, TaxonomyDocument, TaxonomyRegistry,
};
use serde_json::{json, Value as JsonValue};

pub const GARDEN_ID: &str = "https://example.com/banners-garden";
pub const GARDEN_TYPE_ID: &str = "urn:example:garden";
pub const FLOWERS_ID: &str = "urn:example:flowers";
pub const COUNT_TYPE_ID: &str = "urn:example:flower-count";
pub const NOTES_TYPE_ID: &str = "urn:example:notes";
pub const MANUAL_PROCESS_ID: &str = "urn:example:manual-count";

/// Fixed reference instant used across tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 3, 23, 12, 0, 0).unwrap()
}

/// `t0` shifted by `minutes`
pub fn at(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub fn flower_count_schema() -> JsonValue {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": "https://example.com/schemas/flower-count",
        "type": "object",
        "required": ["wisteria"],
        "properties": {
            "wisteria": {"type": "integer", "minimum": 0},
            "tulips": {"type": "integer", "minimum": 0}
        }
    })
}

/// A one feature type taxonomy: `gardens/flowers/{count,notes}`
pub fn garden_document() -> TaxonomyDocument {
    let ft = FeatureType::new(GARDEN_TYPE_ID, "Garden", "gardens").with_property(
        Property::new(FLOWERS_ID, "Flowers", "flowers")
            .with_category("botany")
            .with_property_type(
                PropertyType::new(COUNT_TYPE_ID, "Flower count", "count")
                    .with_schema(SchemaSource::Inline(flower_count_schema())),
            )
            .with_property_type(PropertyType::new(NOTES_TYPE_ID, "Notes", "notes")),
    );

    let mut feature_types = IndexMap::new();
    feature_types.insert(ft.slug.clone(), ft);
    TaxonomyDocument {
        version: "test".to_string(),
        feature_types,
    }
}

pub fn garden_registry() -> TaxonomyRegistry {
    TaxonomyRegistry::new(garden_document()).unwrap()
}

/// A valid garden flower count submission
pub fn garden_submission() -> NewObservation {
    NewObservation::new(
        Referenceable::new(GARDEN_ID).with_label("Banner's garden"),
        Referenceable::new(GARDEN_TYPE_ID),
        Referenceable::new(FLOWERS_ID),
        Referenceable::new(COUNT_TYPE_ID),
        Referenceable::new(MANUAL_PROCESS_ID),
        json!({"wisteria": 5, "tulips": 12}),
    )
}

/// A garden submission about another feature
pub fn submission_for(feature_id: &str) -> NewObservation {
    let mut new_obs = garden_submission();
    new_obs.feature = Referenceable::new(feature_id);
    new_obs
}

/// A stored observation with the given id and result time
pub fn mk_obs(id: &str, feature_id: &str, result_time: DateTime<Utc>) -> Observation {
    let mut new_obs = submission_for(feature_id);
    new_obs.result_time = Some(result_time);
    ObservationFactory::default()
        .create(new_obs, id, t0())
        .unwrap()
}
