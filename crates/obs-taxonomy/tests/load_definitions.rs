//! Loading definition sets from disk

use std::io::Write;

use obs_taxonomy::{Level, SchemaSource, TaxonomyError, TaxonomyRegistry};
use pretty_assertions::assert_eq;

const GARDENS_JSON: &str = r#"{
  "version": "2024-01",
  "featureTypes": {
    "gardens": {
      "id": "urn:example:garden",
      "name": "Garden",
      "slug": "gardens",
      "properties": {
        "flowers": {
          "id": "urn:example:flowers",
          "name": "Flowers",
          "slug": "flowers",
          "category": "botany",
          "propertyTypes": {
            "count": {
              "id": "urn:example:flower-count",
              "name": "Count",
              "slug": "count",
              "version": 2,
              "schema": {"$id": "https://example.com/count", "type": "object"}
            },
            "count-ref": {
              "id": "urn:example:flower-count-ref",
              "name": "Count (by reference)",
              "slug": "count-ref",
              "schemaUrl": "https://example.com/count#"
            }
          }
        }
      }
    }
  }
}"#;

fn write_temp(suffix: &str, text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_loads_json_file() {
    let file = write_temp(".json", GARDENS_JSON);
    let registry = TaxonomyRegistry::from_path(file.path()).unwrap();

    assert_eq!(registry.version(), "2024-01");
    let resolved = registry.resolve("gardens", "flowers", "count").unwrap();
    assert_eq!(resolved.property.category, "botany");
    assert_eq!(resolved.property_type.version, 2);

    let by_ref = registry.resolve("gardens", "flowers", "count-ref").unwrap();
    assert_eq!(
        by_ref.property_type.schema,
        SchemaSource::Reference("https://example.com/count#".to_string())
    );
}

#[test]
fn test_loads_yaml_file() {
    let value: serde_json::Value = serde_json::from_str(GARDENS_JSON).unwrap();
    let yaml = serde_yaml::to_string(&value).unwrap();
    let file = write_temp(".yaml", &yaml);

    let registry = TaxonomyRegistry::from_path(file.path()).unwrap();
    assert!(registry.resolve("gardens", "flowers", "count-ref").is_ok());
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = TaxonomyRegistry::from_path(&path).unwrap_err();
    assert!(matches!(err, TaxonomyError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_rejects_both_schema_sources() {
    let text = GARDENS_JSON.replace(
        r#""schemaUrl": "https://example.com/count#""#,
        r#""schemaUrl": "https://example.com/count#", "schema": {"type": "object"}"#,
    );
    let err = TaxonomyRegistry::from_json_str(&text).unwrap_err();
    assert!(err.to_string().contains("count-ref"));
}

#[test]
fn test_serialized_registry_reloads() {
    let registry = TaxonomyRegistry::builtin().unwrap();
    let json = serde_json::to_string(&registry).unwrap();

    let reloaded = TaxonomyRegistry::from_json_str(&json).unwrap();
    assert_eq!(reloaded.version(), registry.version());
    assert_eq!(
        reloaded.property_types().count(),
        registry.property_types().count()
    );
    assert_eq!(
        reloaded.resolve("people", "goal", "structured").unwrap().property_type,
        registry.resolve("people", "goal", "structured").unwrap().property_type
    );
}

#[test]
fn test_resolution_miss_names_segment() {
    let registry = TaxonomyRegistry::builtin().unwrap();

    let err = registry.resolve("people", "goal", "haiku").unwrap_err();
    assert_eq!(err.level, Level::PropertyType);
    assert_eq!(err.to_string(), "could not find property type 'haiku'");
}
