//! Payload validation against property type schemas
//!
//! Schemas are compiled once, when the validator is built from a registry.
//! Schema references are resolved only against documents the registry
//! already holds; nothing is fetched over the network.

use std::collections::HashMap;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use obs_taxonomy::{PropertyType, SchemaSource, TaxonomyRegistry};
use serde_json::{json, Value as JsonValue};

use crate::error::{FieldError, ObservationError, SchemaError, ValidationError, INVALID_PAYLOAD};

/// Field name used for errors located at the document root
pub const ROOT_FIELD: &str = "(root)";

/// Validates opaque payloads against the schema of their property type
pub struct PayloadValidator {
    compiled: HashMap<String, JSONSchema>,
    documents: Vec<(String, JsonValue)>,
}

impl PayloadValidator {
    /// Validator that knows no schemas
    ///
    /// Inline schemas are still compiled on demand; references fail.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            compiled: HashMap::new(),
            documents: Vec::new(),
        }
    }

    /// Compile every schema in the registry
    ///
    /// # Errors
    /// Returns error if any schema fails to compile
    pub fn new(registry: &TaxonomyRegistry) -> Result<Self, SchemaError> {
        let documents: Vec<(String, JsonValue)> = registry
            .schema_documents()
            .map(|(id, doc)| (id.to_string(), doc.clone()))
            .collect();

        let mut compiled = HashMap::new();
        for pt in registry.property_types() {
            if let Some(schema) = schema_for(pt) {
                compiled.insert(pt.id.clone(), compile(&pt.slug, &schema, &documents)?);
            }
        }

        tracing::debug!(schemas = compiled.len(), "payload schemas compiled");

        Ok(Self {
            compiled,
            documents,
        })
    }

    /// Number of precompiled schemas
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Whether no schema was precompiled
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Check a payload, returning every schema violation as a field error
    ///
    /// A property type without a schema accepts any payload.
    ///
    /// # Errors
    /// Returns error if the property type's schema cannot be compiled or
    /// references an unknown document
    pub fn check(
        &self,
        payload: &JsonValue,
        property_type: &PropertyType,
    ) -> Result<Vec<FieldError>, SchemaError> {
        if let Some(schema) = self.compiled.get(&property_type.id) {
            return Ok(collect_errors(schema, payload));
        }

        match &property_type.schema {
            SchemaSource::None => Ok(Vec::new()),
            SchemaSource::Reference(url) if !self.knows(url) => {
                Err(SchemaError::UnresolvedReference {
                    property_type: property_type.slug.clone(),
                    url: url.clone(),
                })
            }
            _ => {
                let Some(schema) = schema_for(property_type) else {
                    return Ok(Vec::new());
                };
                let compiled = compile(&property_type.slug, &schema, &self.documents)?;
                Ok(collect_errors(&compiled, payload))
            }
        }
    }

    /// Validate a payload
    ///
    /// # Errors
    /// Returns [`ObservationError::Invalid`] with one field error per
    /// violation, or [`ObservationError::Schema`] if the schema is unusable
    pub fn validate(
        &self,
        payload: &JsonValue,
        property_type: &PropertyType,
    ) -> Result<(), ObservationError> {
        let fields = self.check(payload, property_type)?;
        ValidationError::check(INVALID_PAYLOAD, fields)?;
        Ok(())
    }

    fn knows(&self, url: &str) -> bool {
        let url = url.trim_end_matches('#');
        self.documents
            .iter()
            .any(|(id, _)| id.trim_end_matches('#') == url)
    }
}

impl Default for PayloadValidator {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for PayloadValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadValidator")
            .field("schemas", &self.compiled.len())
            .field("documents", &self.documents.len())
            .finish()
    }
}

fn schema_for(property_type: &PropertyType) -> Option<JsonValue> {
    match &property_type.schema {
        SchemaSource::None => None,
        SchemaSource::Inline(schema) => Some(schema.clone()),
        SchemaSource::Reference(url) => Some(json!({ "$ref": url })),
    }
}

fn compile(
    slug: &str,
    schema: &JsonValue,
    documents: &[(String, JsonValue)],
) -> Result<JSONSchema, SchemaError> {
    let mut options = JSONSchema::options();
    options.with_draft(Draft::Draft7);
    for (id, document) in documents {
        options.with_document(id.clone(), document.clone());
    }

    options.compile(schema).map_err(|e| SchemaError::Compile {
        property_type: slug.to_string(),
        reason: e.to_string(),
    })
}

fn collect_errors(schema: &JSONSchema, payload: &JsonValue) -> Vec<FieldError> {
    match schema.validate(payload) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|e| to_field_error(&e)).collect(),
    }
}

fn to_field_error(error: &jsonschema::ValidationError<'_>) -> FieldError {
    let mut segments = error.instance_path.clone().into_vec();
    if let ValidationErrorKind::Required { property } = &error.kind {
        if let Some(name) = property.as_str() {
            segments.push(name.to_string());
        }
    }

    let field = if segments.is_empty() {
        ROOT_FIELD.to_string()
    } else {
        segments.join(".")
    };

    FieldError::new(field, error.to_string())
}
