//! Error types for taxonomy loading and resolution

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Level of the taxonomy hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    /// Top level: feature types
    FeatureType,
    /// Properties of a feature type
    Property,
    /// Property types of a property
    PropertyType,
}

impl Level {
    /// Human readable name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureType => "feature type",
            Self::Property => "property",
            Self::PropertyType => "property type",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slug that did not resolve
///
/// `level` names the first lookup that missed, so callers can report
/// exactly which segment was invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not find {level} '{slug}'")]
pub struct ResolveError {
    /// Where the lookup failed
    pub level: Level,
    /// The slug that was not found
    pub slug: String,
}

impl ResolveError {
    /// Create resolution miss
    #[inline]
    pub fn new(level: Level, slug: impl Into<String>) -> Self {
        Self {
            level,
            slug: slug.into(),
        }
    }
}

/// Errors raised while loading or checking a definition set
#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    /// Property type declares `schema` and `schemaUrl`
    #[error("property type '{slug}' declares both an inline schema and a schema url")]
    ConflictingSchemaSources { slug: String },

    /// Inline schema is not usable
    #[error("property type '{slug}' has an invalid schema: {reason}")]
    InvalidSchema { slug: String, reason: String },

    /// Map key differs from the entity's slug
    #[error("{level} key '{key}' does not match its slug '{slug}'")]
    SlugMismatch {
        level: Level,
        key: String,
        slug: String,
    },

    /// Entity has an empty id
    #[error("{level} '{slug}' has no id")]
    MissingId { level: Level, slug: String },

    /// Two entities share an id
    #[error("duplicate id '{id}' used by {first} and {second}")]
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },

    /// Schema URL does not match any known schema document
    #[error("property type '{slug}' references unknown schema '{url}'")]
    UnresolvedSchemaReference { slug: String, url: String },

    /// Definitions file could not be read
    #[error("reading definitions from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON definitions
    #[error("invalid JSON definitions: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Malformed YAML definitions
    #[error("invalid YAML definitions: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_names_level() {
        let err = ResolveError::new(Level::Property, "mood");
        assert_eq!(err.to_string(), "could not find property 'mood'");
    }

    #[test]
    fn level_serializes_camel_case() {
        let value = serde_json::to_value(Level::PropertyType).unwrap();
        assert_eq!(value, serde_json::json!("propertyType"));
    }
}
