//! Taxonomy entities
//!
//! A [`FeatureType`] owns its [`Property`] definitions, and each property owns
//! the [`PropertyType`]s it can be measured with. Property types optionally
//! carry the schema a measurement payload must satisfy.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::TaxonomyError;

/// The category of thing being observed (e.g. a person or a group)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureType {
    /// Stable identifier, independent of the slug
    pub id: String,
    /// Human readable name
    pub name: String,
    /// URL-safe key, unique among feature types
    pub slug: String,
    /// Free text description
    #[serde(default)]
    pub description: String,
    /// Observable properties keyed by slug
    #[serde(default)]
    pub properties: IndexMap<String, Property>,
}

impl FeatureType {
    /// Create a feature type without properties
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
            properties: IndexMap::new(),
        }
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a property, keyed by its slug
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.insert(property.slug.clone(), property);
        self
    }

    /// Look up a property by slug
    #[inline]
    #[must_use]
    pub fn property(&self, slug: &str) -> Option<&Property> {
        self.properties.get(slug)
    }
}

/// An observable attribute of a feature type (e.g. "goal")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Stable identifier, independent of the slug
    pub id: String,
    /// Human readable name
    pub name: String,
    /// URL-safe key, unique within the owning feature type
    pub slug: String,
    /// Free text description
    #[serde(default)]
    pub description: String,
    /// Grouping label used by clients
    #[serde(default)]
    pub category: String,
    /// Measurement formats keyed by slug
    #[serde(default)]
    pub property_types: IndexMap<String, PropertyType>,
}

impl Property {
    /// Create a property without property types
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
            category: String::new(),
            property_types: IndexMap::new(),
        }
    }

    /// With category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Add a property type, keyed by its slug
    #[must_use]
    pub fn with_property_type(mut self, property_type: PropertyType) -> Self {
        self.property_types
            .insert(property_type.slug.clone(), property_type);
        self
    }

    /// Look up a property type by slug
    #[inline]
    #[must_use]
    pub fn property_type(&self, slug: &str) -> Option<&PropertyType> {
        self.property_types.get(slug)
    }
}

/// A specific kind of measurement for a property (e.g. "textual goal")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PropertyTypeDocument", into = "PropertyTypeDocument")]
pub struct PropertyType {
    /// Stable identifier, independent of the slug
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Revision of the payload format
    pub version: u32,
    /// URL-safe key, unique within the owning property
    pub slug: String,
    /// Free text description
    pub description: String,
    /// Where the payload schema comes from, if anywhere
    pub schema: SchemaSource,
}

impl PropertyType {
    /// Create a schema-less property type
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: 1,
            slug: slug.into(),
            description: String::new(),
            schema: SchemaSource::None,
        }
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With schema source
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaSource) -> Self {
        self.schema = schema;
        self
    }

    /// Whether payloads of this type are checked against a schema
    #[inline]
    #[must_use]
    pub fn has_schema(&self) -> bool {
        !matches!(self.schema, SchemaSource::None)
    }
}

/// Origin of a property type's payload schema
///
/// On the wire this is the `schema` / `schemaUrl` pair; at most one of them
/// may be present.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchemaSource {
    /// Payloads are accepted verbatim
    #[default]
    None,
    /// Schema document embedded in the definition
    Inline(JsonValue),
    /// Schema identified by URL
    Reference(String),
}

impl SchemaSource {
    /// The embedded document, if any
    #[inline]
    #[must_use]
    pub fn inline(&self) -> Option<&JsonValue> {
        match self {
            Self::Inline(doc) => Some(doc),
            _ => None,
        }
    }

    /// The referenced URL, if any
    #[inline]
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Reference(url) => Some(url),
            _ => None,
        }
    }

    /// `$id` declared by an embedded document
    #[must_use]
    pub fn declared_id(&self) -> Option<&str> {
        self.inline()
            .and_then(|doc| doc.get("$id"))
            .and_then(JsonValue::as_str)
    }
}

/// Wire form of [`PropertyType`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyTypeDocument {
    id: String,
    name: String,
    #[serde(default = "default_version")]
    version: u32,
    slug: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema_url: Option<String>,
}

fn default_version() -> u32 {
    1
}

impl TryFrom<PropertyTypeDocument> for PropertyType {
    type Error = TaxonomyError;

    fn try_from(doc: PropertyTypeDocument) -> Result<Self, Self::Error> {
        let schema = match (doc.schema, doc.schema_url) {
            (Some(_), Some(_)) => {
                return Err(TaxonomyError::ConflictingSchemaSources { slug: doc.slug })
            }
            (Some(schema), None) => {
                if !schema.is_object() {
                    return Err(TaxonomyError::InvalidSchema {
                        slug: doc.slug,
                        reason: "schema must be a JSON object".to_string(),
                    });
                }
                SchemaSource::Inline(schema)
            }
            (None, Some(url)) if url.trim().is_empty() => SchemaSource::None,
            (None, Some(url)) => SchemaSource::Reference(url),
            (None, None) => SchemaSource::None,
        };

        Ok(Self {
            id: doc.id,
            name: doc.name,
            version: doc.version,
            slug: doc.slug,
            description: doc.description,
            schema,
        })
    }
}

impl From<PropertyType> for PropertyTypeDocument {
    fn from(pt: PropertyType) -> Self {
        let (schema, schema_url) = match pt.schema {
            SchemaSource::None => (None, None),
            SchemaSource::Inline(doc) => (Some(doc), None),
            SchemaSource::Reference(url) => (None, Some(url)),
        };

        Self {
            id: pt.id,
            name: pt.name,
            version: pt.version,
            slug: pt.slug,
            description: pt.description,
            schema,
            schema_url,
        }
    }
}
