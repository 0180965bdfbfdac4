//! The persistence port

use std::time::Duration;

use obs_observation::{Observation, ObservationQuery};

/// Errors returned by a store or by a bounded store call
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No observation with this id
    #[error("observation '{0}' not found")]
    NotFound(String),

    /// An observation with this id already exists
    #[error("observation '{0}' already exists")]
    Duplicate(String),

    /// The call did not finish within the caller's deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The caller cancelled the call
    #[error("operation cancelled")]
    Cancelled,

    /// A stored document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this is a missing record
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the same call might succeed if repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Storage for observations
///
/// Implementations must be interchangeable: the rest of the system never
/// branches on which backend is in use.
#[async_trait::async_trait]
pub trait ObservationStore: Send + Sync {
    /// Insert a new observation
    ///
    /// # Errors
    /// [`StoreError::Duplicate`] if the id is taken, or a backend failure
    async fn save(&self, observation: &Observation) -> Result<(), StoreError>;

    /// Fetch one observation
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if absent, or a backend failure
    async fn find_by_id(&self, id: &str) -> Result<Observation, StoreError>;

    /// Fetch every observation matching the query, in the query's order
    ///
    /// # Errors
    /// Returns a backend failure; no matches is an empty list
    async fn find_many(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError>;
}
