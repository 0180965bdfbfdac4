//! Behavior shared by every store backend

use std::sync::Arc;

use obs_observation::{Filter, FilterTranslator, Observation};
use obs_store::{FileStore, MemoryStore, ObservationStore, RequestContext, StoreError};
use obs_test_utils::*;

async fn backends(dir: &tempfile::TempDir) -> Vec<Arc<dyn ObservationStore>> {
    vec![
        Arc::new(MemoryStore::new()),
        Arc::new(FileStore::open(dir.path()).await.unwrap()),
    ]
}

#[tokio::test]
async fn test_payload_round_trips_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir).await {
        let obs = mk_obs("obs-1", GARDEN_ID, at(0));
        store.save(&obs).await.unwrap();

        let found = store.find_by_id(obs.id()).await.unwrap();
        assert_eq!(found.result(), obs.result());
        assert_eq!(found, obs);
    }
}

#[tokio::test]
async fn test_in_filter_across_backends() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir).await {
        for (id, feature, minutes) in [
            ("a", "urn:example:one", 1),
            ("b", "urn:example:two", 2),
            ("c", "urn:example:three", 3),
        ] {
            store.save(&mk_obs(id, feature, at(minutes))).await.unwrap();
        }

        let query = FilterTranslator::new()
            .translate(&[Filter::new("featureId", "in", "urn:example:one,urn:example:three")])
            .unwrap();
        let hits = store.find_many(&query).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(Observation::id).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }
}

#[tokio::test]
async fn test_concurrent_saves_of_same_id() {
    let dir = tempfile::tempdir().unwrap();
    for store in backends(&dir).await {
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.save(&mk_obs("shared", GARDEN_ID, at(0))).await
            }));
        }

        let mut saved = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => saved += 1,
                Err(StoreError::Duplicate(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(saved, 1);
    }
}

#[tokio::test]
async fn test_context_wraps_store_calls() {
    let store = MemoryStore::new();
    let ctx = RequestContext::default();
    let obs = mk_obs("obs-1", GARDEN_ID, at(0));

    ctx.run("save", store.save(&obs)).await.unwrap();
    let found = ctx.run("find_by_id", store.find_by_id("obs-1")).await.unwrap();
    assert_eq!(found.id(), "obs-1");
}
