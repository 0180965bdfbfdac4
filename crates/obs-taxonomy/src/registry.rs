//! Taxonomy registry
//!
//! Built once from a definition set and never mutated afterwards, so a
//! shared `&TaxonomyRegistry` (or `Arc`) can be read from any number of
//! requests without locking.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::{Level, ResolveError, TaxonomyError};
use crate::types::{FeatureType, Property, PropertyType, SchemaSource};

/// A versioned definition set, as loaded from disk or the built-in data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyDocument {
    /// Revision label of the data set
    pub version: String,
    /// Feature types keyed by slug
    pub feature_types: IndexMap<String, FeatureType>,
}

/// The triple a set of slugs resolved to
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Resolved feature type
    pub feature_type: &'a FeatureType,
    /// Resolved property of `feature_type`
    pub property: &'a Property,
    /// Resolved property type of `property`
    pub property_type: &'a PropertyType,
}

/// Slug path of a property type, used for id lookups
#[derive(Debug, Clone)]
struct SlugPath {
    feature_type: String,
    property: String,
    property_type: String,
}

/// Read-only catalog of feature types, properties and property types
#[derive(Debug, Clone)]
pub struct TaxonomyRegistry {
    document: TaxonomyDocument,
    property_types_by_id: HashMap<String, SlugPath>,
}

impl TaxonomyRegistry {
    /// Build a registry, checking the definition set's invariants
    ///
    /// # Errors
    /// Returns error if a key differs from its slug, an id is missing or
    /// reused, or a schema reference points at no known schema document.
    pub fn new(document: TaxonomyDocument) -> Result<Self, TaxonomyError> {
        let mut seen_ids: HashMap<String, String> = HashMap::new();
        let mut property_types_by_id = HashMap::new();

        for (ft_key, ft) in &document.feature_types {
            check_entry(Level::FeatureType, ft_key, &ft.slug, &ft.id)?;
            claim_id(&mut seen_ids, &ft.id, format!("feature type '{ft_key}'"))?;

            for (p_key, property) in &ft.properties {
                check_entry(Level::Property, p_key, &property.slug, &property.id)?;
                claim_id(
                    &mut seen_ids,
                    &property.id,
                    format!("property '{ft_key}/{p_key}'"),
                )?;

                for (pt_key, pt) in &property.property_types {
                    check_entry(Level::PropertyType, pt_key, &pt.slug, &pt.id)?;
                    claim_id(
                        &mut seen_ids,
                        &pt.id,
                        format!("property type '{ft_key}/{p_key}/{pt_key}'"),
                    )?;
                    property_types_by_id.insert(
                        pt.id.clone(),
                        SlugPath {
                            feature_type: ft_key.clone(),
                            property: p_key.clone(),
                            property_type: pt_key.clone(),
                        },
                    );
                }
            }
        }

        let registry = Self {
            document,
            property_types_by_id,
        };
        registry.check_schema_references()?;

        tracing::debug!(
            version = %registry.version(),
            feature_types = registry.document.feature_types.len(),
            property_types = registry.property_types_by_id.len(),
            "taxonomy registry built"
        );

        Ok(registry)
    }

    /// Registry holding the built-in definition set
    ///
    /// # Errors
    /// Returns error only if the built-in data violates an invariant.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::new(crate::definitions::builtin_document()?)
    }

    /// Parse a JSON definition set
    ///
    /// # Errors
    /// Returns error if JSON is malformed or the set is invalid
    pub fn from_json_str(json: &str) -> Result<Self, TaxonomyError> {
        let document: TaxonomyDocument = serde_json::from_str(json)?;
        Self::new(document)
    }

    /// Parse a YAML definition set
    ///
    /// # Errors
    /// Returns error if YAML is malformed or the set is invalid
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TaxonomyError> {
        let document: TaxonomyDocument = serde_yaml::from_str(yaml)?;
        Self::new(document)
    }

    /// Load a definition set from a file; `.yaml`/`.yml` files are parsed
    /// as YAML, everything else as JSON
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path(path: &Path) -> Result<Self, TaxonomyError> {
        let text = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// Resolve a (feature type, property, property type) slug triple
    ///
    /// # Errors
    /// Returns [`ResolveError`] naming the first level that missed
    pub fn resolve(
        &self,
        feature_type_slug: &str,
        property_slug: &str,
        property_type_slug: &str,
    ) -> Result<Resolved<'_>, ResolveError> {
        let feature_type = self
            .feature_type(feature_type_slug)
            .ok_or_else(|| ResolveError::new(Level::FeatureType, feature_type_slug))?;

        let property = feature_type
            .property(property_slug)
            .ok_or_else(|| ResolveError::new(Level::Property, property_slug))?;

        let property_type = property
            .property_type(property_type_slug)
            .ok_or_else(|| ResolveError::new(Level::PropertyType, property_type_slug))?;

        Ok(Resolved {
            feature_type,
            property,
            property_type,
        })
    }

    /// Look up a feature type by slug
    #[inline]
    #[must_use]
    pub fn feature_type(&self, slug: &str) -> Option<&FeatureType> {
        self.document.feature_types.get(slug)
    }

    /// Look up a property type by its stable id
    #[must_use]
    pub fn property_type_by_id(&self, id: &str) -> Option<&PropertyType> {
        let path = self.property_types_by_id.get(id)?;
        self.resolve(&path.feature_type, &path.property, &path.property_type)
            .ok()
            .map(|r| r.property_type)
    }

    /// Feature types in definition order
    pub fn feature_types(&self) -> impl Iterator<Item = &FeatureType> {
        self.document.feature_types.values()
    }

    /// Every property type in the registry
    pub fn property_types(&self) -> impl Iterator<Item = &PropertyType> {
        self.feature_types()
            .flat_map(|ft| ft.properties.values())
            .flat_map(|p| p.property_types.values())
    }

    /// Inline schema documents that declare an `$id`
    pub fn schema_documents(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.property_types().filter_map(|pt| {
            let id = pt.schema.declared_id()?;
            pt.schema.inline().map(|doc| (id, doc))
        })
    }

    /// Revision label of the loaded data set
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// Number of feature types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.document.feature_types.len()
    }

    /// Whether the registry has no feature types
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.document.feature_types.is_empty()
    }

    fn check_schema_references(&self) -> Result<(), TaxonomyError> {
        let known: Vec<&str> = self
            .schema_documents()
            .map(|(id, _)| id.trim_end_matches('#'))
            .collect();

        for pt in self.property_types() {
            if let SchemaSource::Reference(url) = &pt.schema {
                if !known.contains(&url.trim_end_matches('#')) {
                    return Err(TaxonomyError::UnresolvedSchemaReference {
                        slug: pt.slug.clone(),
                        url: url.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl Serialize for TaxonomyRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

fn check_entry(level: Level, key: &str, slug: &str, id: &str) -> Result<(), TaxonomyError> {
    if key != slug {
        return Err(TaxonomyError::SlugMismatch {
            level,
            key: key.to_string(),
            slug: slug.to_string(),
        });
    }
    if id.trim().is_empty() {
        return Err(TaxonomyError::MissingId {
            level,
            slug: slug.to_string(),
        });
    }
    Ok(())
}

fn claim_id(
    seen: &mut HashMap<String, String>,
    id: &str,
    owner: String,
) -> Result<(), TaxonomyError> {
    if let Some(first) = seen.get(id) {
        return Err(TaxonomyError::DuplicateId {
            id: id.to_string(),
            first: first.clone(),
            second: owner,
        });
    }
    seen.insert(id.to_string(), owner);
    Ok(())
}
