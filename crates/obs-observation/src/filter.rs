//! Filter translation
//!
//! Abstract `(path, op, match)` filters become an [`ObservationQuery`]:
//! a conjunction of clauses over the indexed identifier fields. Anything
//! outside the allow-list fails the whole translation.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::model::Observation;

/// An abstract filter as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Field to filter on
    pub path: String,
    /// Operator, `=` or `in`
    pub op: String,
    /// Value, or a comma separated list for `in`
    #[serde(rename = "match", alias = "matcher")]
    pub matcher: String,
}

impl Filter {
    /// Create filter
    #[inline]
    pub fn new(path: impl Into<String>, op: impl Into<String>, matcher: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            op: op.into(),
            matcher: matcher.into(),
        }
    }

    /// Equality filter
    #[inline]
    pub fn equals(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(path, "=", value)
    }
}

/// The search document carried by a list request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Filters, combined with AND
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl SearchParams {
    /// Decode a JSON search document; blank input means no filters
    ///
    /// # Errors
    /// Returns [`FilterError::Malformed`] if the document does not parse
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| FilterError::Malformed(e.to_string()))
    }
}

/// Fields that may be filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedField {
    /// Observation id
    Id,
    /// `feature.id`
    FeatureId,
    /// `featureType.id`
    FeatureTypeId,
    /// `property.id`
    PropertyId,
    /// `propertyType.id`
    PropertyTypeId,
    /// `process.id`
    ProcessId,
}

impl IndexedField {
    /// Every filterable field
    pub const ALL: [Self; 6] = [
        Self::Id,
        Self::FeatureId,
        Self::FeatureTypeId,
        Self::PropertyId,
        Self::PropertyTypeId,
        Self::ProcessId,
    ];

    /// Field for an external path, if it is on the allow-list
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == path)
    }

    /// External name used in filters
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FeatureId => "featureId",
            Self::FeatureTypeId => "featureTypeId",
            Self::PropertyId => "propertyId",
            Self::PropertyTypeId => "propertyTypeId",
            Self::ProcessId => "processId",
        }
    }

    /// Key of the field in a stored observation document
    #[inline]
    #[must_use]
    pub fn document_key(&self) -> &'static str {
        self.as_str()
    }

    /// The field's value on an observation
    #[must_use]
    pub fn value_of<'a>(&self, obs: &'a Observation) -> &'a str {
        match self {
            Self::Id => obs.id(),
            Self::FeatureId => obs.feature_id(),
            Self::FeatureTypeId => obs.feature_type_id(),
            Self::PropertyId => obs.property_id(),
            Self::PropertyTypeId => obs.property_type_id(),
            Self::ProcessId => obs.process_id(),
        }
    }
}

impl fmt::Display for IndexedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Field equals the value
    Equals(String),
    /// Field equals one of the values
    In(Vec<String>),
}

impl Matcher {
    /// Whether `value` satisfies the matcher
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Equals(expected) => expected == value,
            Self::In(candidates) => candidates.iter().any(|c| c == value),
        }
    }
}

/// One translated filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Field the clause tests
    pub field: IndexedField,
    /// Accepted value(s)
    pub matcher: Matcher,
}

impl Clause {
    /// Whether the observation satisfies this clause
    #[inline]
    #[must_use]
    pub fn matches(&self, obs: &Observation) -> bool {
        self.matcher.accepts(self.field.value_of(obs))
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recent result first
    #[default]
    ResultTimeDescending,
    /// Oldest result first
    ResultTimeAscending,
}

impl SortOrder {
    /// Compare two observations under this order
    #[must_use]
    pub fn compare(&self, a: &Observation, b: &Observation) -> Ordering {
        match self {
            Self::ResultTimeDescending => b.result_time().cmp(&a.result_time()),
            Self::ResultTimeAscending => a.result_time().cmp(&b.result_time()),
        }
    }
}

/// Backend predicate: every clause must hold
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservationQuery {
    /// Clauses, all of which must hold
    pub clauses: Vec<Clause>,
    /// Result ordering
    pub order: SortOrder,
}

impl ObservationQuery {
    /// Query matching every observation
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether the observation satisfies every clause
    #[must_use]
    pub fn matches(&self, obs: &Observation) -> bool {
        self.clauses.iter().all(|c| c.matches(obs))
    }

    /// Sort observations in place under the query's order
    pub fn sort(&self, observations: &mut [Observation]) {
        observations.sort_by(|a, b| self.order.compare(a, b));
    }
}

/// Translates abstract filters into an [`ObservationQuery`]
#[derive(Debug, Clone, Copy)]
pub struct FilterTranslator {
    delimiter: char,
    order: SortOrder,
}

impl Default for FilterTranslator {
    fn default() -> Self {
        Self {
            delimiter: ',',
            order: SortOrder::default(),
        }
    }
}

impl FilterTranslator {
    /// Translator with the default delimiter and ordering
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With result ordering
    #[inline]
    #[must_use]
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Translate filters, failing on the first one that is not allowed
    ///
    /// # Errors
    /// Returns [`FilterError`] for an unknown field, an unsupported
    /// operator, or an `in` list with no values
    pub fn translate(&self, filters: &[Filter]) -> Result<ObservationQuery, FilterError> {
        let clauses = filters
            .iter()
            .map(|f| self.clause(f))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ObservationQuery {
            clauses,
            order: self.order,
        })
    }

    fn clause(&self, filter: &Filter) -> Result<Clause, FilterError> {
        let field = IndexedField::from_path(&filter.path)
            .ok_or_else(|| FilterError::UnsupportedField(filter.path.clone()))?;

        let matcher = match filter.op.as_str() {
            "=" => Matcher::Equals(filter.matcher.clone()),
            "in" => {
                let values: Vec<String> = filter
                    .matcher
                    .split(self.delimiter)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                if values.is_empty() {
                    return Err(FilterError::EmptyMatcher(filter.path.clone()));
                }
                Matcher::In(values)
            }
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        };

        Ok(Clause { field, matcher })
    }
}
