//! Error types for validation, schema compilation and filtering

use serde::{Deserialize, Serialize};

/// Top-level message for structural and combined validation failures
pub const INVALID_OBSERVATION: &str = "error validating observation";

/// Top-level message for payload-only validation failures
pub const INVALID_PAYLOAD: &str = "validation error";

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path using the external (camelCase) names
    pub field: String,
    /// What is wrong with it
    pub error: String,
}

impl FieldError {
    /// Create field error
    #[inline]
    pub fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            error: error.into(),
        }
    }
}

/// A validation failure carrying every field error found
///
/// Serializes as `{"error": ..., "fields": [{"field": ..., "error": ...}]}`.
/// The display form is the message followed by one tab-separated
/// `field: error` entry per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}{}", render_fields(.fields))]
pub struct ValidationError {
    /// Top-level message
    #[serde(rename = "error")]
    pub message: String,
    /// Field errors, in discovery order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Create error without field details
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Succeed when `fields` is empty, otherwise fail with all of them
    ///
    /// # Errors
    /// Returns the collected field errors under `message`
    pub fn check(message: impl Into<String>, fields: Vec<FieldError>) -> Result<(), Self> {
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Self {
                message: message.into(),
                fields,
            })
        }
    }

    /// Add a field error
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, error: impl Into<String>) -> Self {
        self.fields.push(FieldError::new(field, error));
        self
    }

    /// Whether any error was reported for `field`
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }

    /// Field errors reported for `field`
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.field == field)
            .map(|f| f.error.as_str())
    }
}

fn render_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("\t{}: {}", f.field, f.error))
        .collect()
}

/// A payload schema that could not be prepared
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Schema failed to compile
    #[error("schema for property type '{property_type}' does not compile: {reason}")]
    Compile {
        property_type: String,
        reason: String,
    },

    /// Schema reference points at no known document
    #[error("property type '{property_type}' references unknown schema '{url}'")]
    UnresolvedReference { property_type: String, url: String },
}

/// Failure of a combined (structural and payload) check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObservationError {
    /// The submission is invalid
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The payload schema itself is unusable
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Rejected filter
///
/// Every variant renders with the `invalid filter parameter` prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// Path is not one of the indexed fields
    #[error("invalid filter parameter: unsupported field '{0}'")]
    UnsupportedField(String),

    /// Operator is not one of the supported operators
    #[error("invalid filter parameter: unsupported operator '{0}'")]
    UnsupportedOperator(String),

    /// An `in` matcher with no usable values
    #[error("invalid filter parameter: empty value list for '{0}'")]
    EmptyMatcher(String),

    /// Search parameters did not parse
    #[error("invalid filter parameter: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn display_appends_fields() {
        let err = ValidationError::new(INVALID_OBSERVATION)
            .with_field("feature.id", "feature.id is a required field")
            .with_field("result", "result must not be null");

        assert_eq!(
            err.to_string(),
            "error validating observation\tfeature.id: feature.id is a required field\tresult: result must not be null"
        );
    }

    #[test]
    fn serializes_error_shape() {
        let err = ValidationError::new(INVALID_PAYLOAD).with_field("goal", "missing");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"error": "validation error", "fields": [{"field": "goal", "error": "missing"}]})
        );
    }

    #[test]
    fn check_passes_when_empty() {
        assert!(ValidationError::check(INVALID_OBSERVATION, Vec::new()).is_ok());

        let err = ValidationError::check(
            INVALID_OBSERVATION,
            vec![FieldError::new("process.id", "bad")],
        )
        .unwrap_err();
        assert!(err.has_field("process.id"));
        assert_eq!(err.errors_for("process.id").collect::<Vec<_>>(), vec!["bad"]);
    }

    #[test]
    fn filter_errors_share_prefix() {
        for err in [
            FilterError::UnsupportedField("label".into()),
            FilterError::UnsupportedOperator("<".into()),
            FilterError::EmptyMatcher("id".into()),
            FilterError::Malformed("eof".into()),
        ] {
            assert!(err.to_string().starts_with("invalid filter parameter"));
        }
    }
}
