//! In-memory store

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use obs_observation::{Observation, ObservationQuery};

use crate::port::{ObservationStore, StoreError};

/// Observations held in a concurrent map; lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    observations: DashMap<String, Observation>,
}

impl MemoryStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored observations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[async_trait::async_trait]
impl ObservationStore for MemoryStore {
    async fn save(&self, observation: &Observation) -> Result<(), StoreError> {
        match self.observations.entry(observation.id().to_string()) {
            Entry::Occupied(entry) => Err(StoreError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(observation.clone());
                tracing::debug!(id = observation.id(), "observation stored in memory");
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Observation, StoreError> {
        self.observations
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_many(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError> {
        let mut hits: Vec<Observation> = self
            .observations
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        query.sort(&mut hits);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obs_observation::{Filter, FilterTranslator};
    use obs_test_utils::{at, mk_obs, GARDEN_ID};

    #[tokio::test]
    async fn test_save_then_find() {
        let store = MemoryStore::new();
        let obs = mk_obs("obs-1", GARDEN_ID, at(0));

        store.save(&obs).await.unwrap();
        assert_eq!(store.find_by_id("obs-1").await.unwrap(), obs);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = MemoryStore::new();
        let obs = mk_obs("obs-1", GARDEN_ID, at(0));

        store.save(&obs).await.unwrap();
        let err = store.save(&obs).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "obs-1"));
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.find_by_id("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_find_many_filters_and_orders() {
        let store = MemoryStore::new();
        store.save(&mk_obs("a", GARDEN_ID, at(0))).await.unwrap();
        store.save(&mk_obs("b", "urn:example:other", at(5))).await.unwrap();
        store.save(&mk_obs("c", GARDEN_ID, at(10))).await.unwrap();

        let query = FilterTranslator::new()
            .translate(&[Filter::equals("featureId", GARDEN_ID)])
            .unwrap();
        let hits = store.find_many(&query).await.unwrap();

        let ids: Vec<&str> = hits.iter().map(Observation::id).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let store = MemoryStore::new();
        store.save(&mk_obs("a", GARDEN_ID, at(0))).await.unwrap();

        let query = FilterTranslator::new()
            .translate(&[Filter::equals("processId", "urn:example:none")])
            .unwrap();
        assert!(store.find_many(&query).await.unwrap().is_empty());
    }
}
